use egui::{ComboBox, Context, Grid, Slider, Ui, Window};
use log::warn;

use crate::config::rendering::{
    LandscapeEnvironment, OglConfig, RgbColor, FLAG_LABELS, MAX_ANISOTROPY, MULTISAMPLE_CHOICES,
};
use crate::config::texture::{ColorFormat, TextureFilter, TextureResolution, TextureType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Accepted,
    Cancelled,
}

/// Anything that lets the player edit a working copy of the configuration.
pub trait ConfigureDialog {
    fn run(&mut self, working: &mut OglConfig) -> DialogOutcome;
}

impl<F> ConfigureDialog for F
where
    F: FnMut(&mut OglConfig) -> DialogOutcome,
{
    fn run(&mut self, working: &mut OglConfig) -> DialogOutcome {
        self(working)
    }
}

/// Runs the dialog on a copy of `data`; returns whether the changes were
/// accepted and written back.
pub fn configure_dialog<D: ConfigureDialog + ?Sized>(dialog: &mut D, data: &mut OglConfig) -> bool {
    let mut working = data.clone();
    match dialog.run(&mut working) {
        DialogOutcome::Accepted => commit(working, data),
        DialogOutcome::Cancelled => false,
    }
}

fn commit(working: OglConfig, data: &mut OglConfig) -> bool {
    if let Err(e) = working.validate() {
        warn!("Discarding OpenGL settings: {}", e);
        return false;
    }
    *data = working;
    true
}

fn color_button(ui: &mut Ui, color: &mut RgbColor) {
    let mut rgb = color.to_srgb8();
    if ui.color_edit_button_srgb(&mut rgb).changed() {
        *color = RgbColor::from_srgb8(rgb);
    }
}

fn filter_combo(ui: &mut Ui, id: (TextureType, &str), value: &mut TextureFilter, choices: &[TextureFilter]) {
    ComboBox::from_id_source(id)
        .selected_text(value.label())
        .show_ui(ui, |ui| {
            for choice in choices {
                ui.selectable_value(value, *choice, choice.label());
            }
        });
}

/// egui window over a working copy of the configuration.
#[derive(Debug)]
pub struct OglSettingsWindow {
    working: OglConfig,
    open: bool,
}

impl OglSettingsWindow {
    pub fn new(current: &OglConfig) -> Self {
        Self {
            working: current.clone(),
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn working(&self) -> &OglConfig {
        &self.working
    }

    pub fn working_mut(&mut self) -> &mut OglConfig {
        &mut self.working
    }

    /// Draws one frame. Returns the outcome on the frame the window closes;
    /// closing it from the title bar counts as cancelling.
    pub fn show(&mut self, ctx: &Context) -> Option<DialogOutcome> {
        if !self.open {
            return None;
        }

        let mut outcome = None;
        let mut open = true;
        Window::new("OpenGL Options")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_size([480.0, 560.0])
            .show(ctx, |ui| {
                self.show_textures(ui);
                ui.separator();
                self.show_flags(ui);
                ui.separator();
                self.show_colors(ui);
                ui.separator();
                self.show_sampling(ui);
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        outcome = Some(DialogOutcome::Accepted);
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = Some(DialogOutcome::Cancelled);
                    }
                    if ui.button("Defaults").clicked() {
                        self.working = OglConfig::default();
                    }
                });
            });

        if !open && outcome.is_none() {
            outcome = Some(DialogOutcome::Cancelled);
        }
        if outcome.is_some() {
            self.open = false;
        }
        outcome
    }

    /// Writes the working copy into `data` when accepted.
    pub fn finish(&self, outcome: DialogOutcome, data: &mut OglConfig) -> bool {
        match outcome {
            DialogOutcome::Accepted => commit(self.working.clone(), data),
            DialogOutcome::Cancelled => false,
        }
    }

    fn show_textures(&mut self, ui: &mut Ui) {
        ui.heading("Textures");
        Grid::new("ogl_textures")
            .num_columns(5)
            .spacing([20.0, 8.0])
            .striped(true)
            .show(ui, |ui| {
                ui.label("");
                ui.label("Near");
                ui.label("Far");
                ui.label("Size");
                ui.label("Depth");
                ui.end_row();

                for kind in TextureType::ALL {
                    let config = &mut self.working.textures[kind];
                    ui.label(kind.label());
                    filter_combo(ui, (kind, "near"), &mut config.near_filter, &TextureFilter::NEAR);
                    filter_combo(ui, (kind, "far"), &mut config.far_filter, &TextureFilter::ALL);

                    ComboBox::from_id_source((kind, "resolution"))
                        .selected_text(config.resolution.label())
                        .show_ui(ui, |ui| {
                            for choice in TextureResolution::ALL {
                                ui.selectable_value(&mut config.resolution, choice, choice.label());
                            }
                        });
                    ComboBox::from_id_source((kind, "color_format"))
                        .selected_text(config.color_format.label())
                        .show_ui(ui, |ui| {
                            for choice in ColorFormat::ALL {
                                ui.selectable_value(&mut config.color_format, choice, choice.label());
                            }
                        });
                    ui.end_row();
                }
            });
    }

    fn show_flags(&mut self, ui: &mut Ui) {
        ui.heading("Rendering");
        Grid::new("ogl_flags").num_columns(2).show(ui, |ui| {
            for (i, (flag, label)) in FLAG_LABELS.iter().enumerate() {
                let mut on = self.working.flags.contains(*flag);
                if ui.checkbox(&mut on, *label).changed() {
                    self.working.flags.set(*flag, on);
                }
                if i % 2 == 1 {
                    ui.end_row();
                }
            }
        });
    }

    fn show_colors(&mut self, ui: &mut Ui) {
        let void_enabled = self.working.flags.contains(crate::config::rendering::RenderFlags::VOID_COLOR);
        ui.horizontal(|ui| {
            ui.label("Void color:");
            ui.add_enabled_ui(void_enabled, |ui| color_button(ui, &mut self.working.void_color));
        });

        Grid::new("ogl_landscapes").num_columns(3).show(ui, |ui| {
            ui.label("Landscape");
            ui.label("Ground");
            ui.label("Sky");
            ui.end_row();
            for env in LandscapeEnvironment::ALL {
                let colors = &mut self.working.landscape_colors[env];
                ui.label(env.label());
                color_button(ui, &mut colors.ground);
                color_button(ui, &mut colors.sky);
                ui.end_row();
            }
        });
    }

    fn show_sampling(&mut self, ui: &mut Ui) {
        ui.add(
            Slider::new(&mut self.working.anisotropy_level, 1.0..=MAX_ANISOTROPY)
                .text("Anisotropic filtering"),
        );
        ComboBox::from_label("Multisampling")
            .selected_text(format!("{}x", self.working.multisamples))
            .show_ui(ui, |ui| {
                for choice in MULTISAMPLE_CHOICES {
                    ui.selectable_value(&mut self.working.multisamples, choice, format!("{}x", choice));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::rendering::RenderFlags;

    #[test]
    fn test_accepted_changes_are_written_back() {
        let mut data = OglConfig::default();
        let accepted = configure_dialog(
            &mut |working: &mut OglConfig| {
                working.flags.insert(RenderFlags::FLAT_LAND);
                working.multisamples = 4;
                DialogOutcome::Accepted
            },
            &mut data,
        );
        assert!(accepted);
        assert!(data.flags.contains(RenderFlags::FLAT_LAND));
        assert_eq!(data.multisamples, 4);
    }

    #[test]
    fn test_cancel_leaves_data_untouched() {
        let mut data = OglConfig::default();
        let accepted = configure_dialog(
            &mut |working: &mut OglConfig| {
                working.flags = RenderFlags::empty();
                DialogOutcome::Cancelled
            },
            &mut data,
        );
        assert!(!accepted);
        assert_eq!(data, OglConfig::default());
    }

    #[test]
    fn test_invalid_edits_are_discarded() {
        let mut data = OglConfig::default();
        let accepted = configure_dialog(
            &mut |working: &mut OglConfig| {
                working.multisamples = 5;
                DialogOutcome::Accepted
            },
            &mut data,
        );
        assert!(!accepted);
        assert_eq!(data.multisamples, 0);
    }

    #[test]
    fn test_window_stays_open_without_input() {
        let ctx = Context::default();
        let mut window = OglSettingsWindow::new(&OglConfig::default());
        let mut outcome = Some(DialogOutcome::Accepted);
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            outcome = window.show(ctx);
        });
        assert_eq!(outcome, None);
        assert!(window.is_open());
    }

    #[test]
    fn test_window_finish_commits_working_copy() {
        let mut data = OglConfig::default();
        let mut window = OglSettingsWindow::new(&data);
        window.working_mut().anisotropy_level = 4.0;

        assert!(!window.finish(DialogOutcome::Cancelled, &mut data));
        assert_eq!(data.anisotropy_level, 1.0);
        assert!(window.finish(DialogOutcome::Accepted, &mut data));
        assert_eq!(data.anisotropy_level, 4.0);
    }
}
