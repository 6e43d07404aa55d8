use super::ActionProgress;
use super::UploaderApp;
use batch_uploader::upload::queue::{BATCH_COUNT_CEILING, BATCH_SIZE_CEILING};
use batch_uploader::utils::file_size::FileSizeUtils;
use eframe::egui::{self, Color32, RichText};

impl UploaderApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        let hovering = ctx.input(|i| !i.raw.hovered_files.is_empty());

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(20.0);
            ui.vertical_centered(|ui| {
                ui.heading("Batch Uploader");
                ui.add_space(5.0);
                ui.label(
                    RichText::new("Pick files or drop files and folders onto this window")
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                );
            });

            ui.add_space(20.0);

            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label("Upload endpoint");
                    ui.add_space(4.0);
                    ui.label("ℹ").on_hover_text_at_pointer(format!(
                        "Files are sent as multipart form posts, at most {} files or {} per request.",
                        BATCH_COUNT_CEILING,
                        FileSizeUtils::format_size(BATCH_SIZE_CEILING),
                    ));
                });
                ui.add_space(8.0);
                ui.add_enabled(
                    !self.state.is_uploading,
                    egui::TextEdit::singleline(&mut self.endpoint)
                        .desired_width(ui.available_width())
                        .font(egui::TextStyle::Monospace)
                        .hint_text("https://example.com/upload"),
                );
            });

            ui.add_space(20.0);

            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.add_enabled_ui(!self.state.is_uploading, |ui| {
                        if ui.button("📄 Select Files").clicked() {
                            self.pick_files();
                        }
                        if ui.button("📁 Select Folder").clicked() {
                            self.pick_folder();
                        }
                    });
                });
                ui.add_space(8.0);
                self.render_drop_zone(ui, hovering);
            });

            ui.add_space(20.0);
            self.render_progress(ui);
            self.render_footer(ui);
        });
    }

    fn render_drop_zone(&self, ui: &mut egui::Ui, hovering: bool) {
        let stroke_color = if hovering {
            Color32::from_rgb(161, 89, 225)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke.color
        };
        egui::Frame::none()
            .stroke(egui::Stroke::new(1.5, stroke_color))
            .rounding(6.0)
            .inner_margin(24.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    let text = if self.state.is_uploading {
                        "Upload in progress"
                    } else if hovering {
                        "Release to upload"
                    } else {
                        "Drop files or folders here"
                    };
                    ui.label(RichText::new(text).color(stroke_color));
                });
            });
    }

    fn render_progress(&mut self, ui: &mut egui::Ui) {
        if matches!(self.state.progress, ActionProgress::NotStarted) {
            return;
        }

        ui.group(|ui| {
            if matches!(
                self.state.progress,
                ActionProgress::Uploading { .. } | ActionProgress::Completed { .. }
            ) {
                let fraction = self.state.get_progress_percentage();
                ui.add(
                    egui::ProgressBar::new(fraction)
                        .text(FileSizeUtils::format_percent(fraction as f64)),
                );
                ui.add_space(8.0);
            }
            ui.label(self.state.get_status_text());

            if let Some(response) = &self.state.last_response {
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!("Server response: {}", response))
                        .small()
                        .color(Color32::from_rgb(150, 150, 150)),
                );
            }

            if !self.state.is_uploading {
                ui.add_space(8.0);
                if ui.button("🔄 Reset").clicked() {
                    self.reset_upload_state();
                }
            }
        });
    }

    fn render_footer(&self, ui: &mut egui::Ui) {
        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.vertical_centered(|ui| {
                ui.colored_label(Color32::from_rgb(220, 50, 50), error);
            });
        }
    }
}
