//! Floating assistant widget: egui/eframe application.
//!
//! [`AssistantApp`] never touches the session directly.  Every frame it
//! copies the latest [`PanelSnapshot`] out of the [`SharedPanel`] and renders
//! it; every click becomes an [`AssistantCommand`] on the controller's
//! channel.
//!
//! | Panel | Visual |
//! |-------|--------|
//! | closed | "Call AI" launcher button |
//! | Idle | avatar, "Ready for your free audit?", call button |
//! | Connecting | pulsing avatar, "Connecting secure line..." |
//! | in call | "MM:SS - Call in progress", hang-up button |
//! | Error | short error message in orange |

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::completion::prompt::{ASSISTANT_NAME, COMPANY_NAME};
use crate::config::AppConfig;
use crate::session::{
    AssistantCommand, CallMode, PanelSnapshot, Role, SessionState, SharedPanel,
};

const NEON_LIME: egui::Color32 = egui::Color32::from_rgb(57, 255, 20);
const PANEL_BG: egui::Color32 = egui::Color32::from_rgb(17, 24, 39);
const MUTED: egui::Color32 = egui::Color32::from_rgb(156, 163, 175);
const DANGER: egui::Color32 = egui::Color32::from_rgb(239, 68, 68);
const WARNING: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);

pub struct AssistantApp {
    panel: SharedPanel,
    command_tx: mpsc::Sender<AssistantCommand>,
    config: AppConfig,
    /// Text box contents.
    draft: String,
    pulse_phase: f32,
    last_position: Option<egui::Pos2>,
}

impl AssistantApp {
    pub fn new(
        panel: SharedPanel,
        command_tx: mpsc::Sender<AssistantCommand>,
        config: AppConfig,
    ) -> Self {
        Self {
            panel,
            command_tx,
            config,
            draft: String::new(),
            pulse_phase: 0.0,
            last_position: None,
        }
    }

    fn snapshot(&self) -> PanelSnapshot {
        self.panel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn send(&self, command: AssistantCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("ui: dropping command: {e}");
        }
    }

    // ── Closed ────────────────────────────────────────────────────────────

    fn draw_launcher(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            let button = egui::Button::new(
                egui::RichText::new("Call AI").color(egui::Color32::BLACK).strong(),
            )
            .fill(NEON_LIME)
            .corner_radius(egui::CornerRadius::same(20))
            .min_size(egui::vec2(120.0, 40.0));

            if ui.add(button).clicked() {
                self.send(AssistantCommand::Open);
            }
        });
    }

    // ── Open ──────────────────────────────────────────────────────────────

    fn draw_header(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, snap: &PanelSnapshot) {
        ui.horizontal(|ui| {
            let dot = if snap.in_call() { NEON_LIME } else { MUTED };
            ui.label(egui::RichText::new("●").color(dot).size(10.0));

            let title = ui.add(
                egui::Label::new(
                    egui::RichText::new("SECURE LINE")
                        .color(MUTED)
                        .size(11.0)
                        .strong(),
                )
                .sense(egui::Sense::drag()),
            );
            if title.dragged() {
                if let Some(outer) = ctx.input(|i| i.viewport().outer_rect) {
                    let delta = ctx.input(|i| i.pointer.delta());
                    ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(
                        outer.min + delta,
                    ));
                }
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let close = egui::Button::new(egui::RichText::new("x").color(MUTED))
                    .frame(false);
                if ui.add(close).on_hover_text("Close").clicked() {
                    self.send(AssistantCommand::Close);
                }
            });
        });
    }

    fn draw_avatar(&self, ui: &mut egui::Ui, snap: &PanelSnapshot) {
        let (rect, _) =
            ui.allocate_exact_size(egui::vec2(ui.available_width(), 84.0), egui::Sense::hover());
        let painter = ui.painter();
        let center = rect.center();

        if snap.in_call() {
            let ring = 34.0 + 6.0 * (self.pulse_phase.sin() * 0.5 + 0.5);
            painter.circle_stroke(
                center,
                ring,
                egui::Stroke::new(2.0, NEON_LIME.gamma_multiply(0.5)),
            );
        }
        painter.circle_filled(center, 30.0, egui::Color32::from_rgb(31, 41, 55));
        painter.text(
            center,
            egui::Align2::CENTER_CENTER,
            &ASSISTANT_NAME[..1],
            egui::FontId::proportional(26.0),
            NEON_LIME,
        );
    }

    fn draw_identity(&self, ui: &mut egui::Ui, snap: &PanelSnapshot) {
        ui.vertical_centered(|ui| {
            ui.label(
                egui::RichText::new(ASSISTANT_NAME)
                    .color(egui::Color32::WHITE)
                    .size(18.0)
                    .strong(),
            );
            ui.label(egui::RichText::new(COMPANY_NAME).color(MUTED).size(12.0));
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(snap.status_line())
                    .color(status_color(snap))
                    .size(13.0),
            );
            if let Some(note) = hosted_audio_note(snap) {
                ui.label(egui::RichText::new(note).color(MUTED).size(10.0));
            }
        });
    }

    fn draw_transcript(&self, ui: &mut egui::Ui, snap: &PanelSnapshot) {
        if !self.config.ui.show_transcript || snap.turns.is_empty() {
            return;
        }
        ui.separator();
        egui::ScrollArea::vertical()
            .max_height(140.0)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for turn in &snap.turns {
                    let (who, color) = match turn.role {
                        Role::User => ("You", egui::Color32::WHITE),
                        _ => (ASSISTANT_NAME, NEON_LIME),
                    };
                    ui.label(
                        egui::RichText::new(format!("{who}: {}", turn.content))
                            .color(color)
                            .size(12.0),
                    );
                }
            });
    }

    fn draw_call_button(&mut self, ui: &mut egui::Ui, snap: &PanelSnapshot) {
        ui.vertical_centered(|ui| {
            let (label, fill, text) = if snap.in_call() {
                ("End Call", DANGER, egui::Color32::WHITE)
            } else {
                ("Call AI Sales Partner", NEON_LIME, egui::Color32::BLACK)
            };
            let button = egui::Button::new(egui::RichText::new(label).color(text).strong())
                .fill(fill)
                .corner_radius(egui::CornerRadius::same(16))
                .min_size(egui::vec2(ui.available_width(), 36.0));
            if ui.add(button).clicked() {
                self.send(AssistantCommand::ToggleCall);
            }
        });
    }

    fn draw_message_box(&mut self, ui: &mut egui::Ui, snap: &PanelSnapshot) {
        let enabled = accepts_typing(snap);
        ui.horizontal(|ui| {
            let edit = egui::TextEdit::singleline(&mut self.draft)
                .hint_text("Type a message...")
                .desired_width(ui.available_width() - 52.0);
            let response = ui.add_enabled(enabled, edit);
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let clicked = ui
                .add_enabled(enabled && !self.draft.trim().is_empty(), egui::Button::new("Send"))
                .clicked();

            if enabled && (submitted || clicked) && !self.draft.trim().is_empty() {
                let text = std::mem::take(&mut self.draft);
                self.send(AssistantCommand::SubmitUtterance(text));
            }
        });
    }
}

/// Typing is only possible when the controller would accept the message.
pub fn accepts_typing(snap: &PanelSnapshot) -> bool {
    matches!(
        snap.state,
        SessionState::Idle | SessionState::Speaking | SessionState::Error
    ) && snap.call != CallMode::Hosted
}

/// Shown during hosted calls, whose audio this app does not carry.
pub fn hosted_audio_note(snap: &PanelSnapshot) -> Option<&'static str> {
    (snap.call == CallMode::Hosted)
        .then_some("Voice runs in the provider's web client; this panel tracks the call.")
}

/// Window size for the current view.
pub fn window_size(snap: &PanelSnapshot, show_transcript: bool) -> egui::Vec2 {
    if !snap.open {
        return egui::vec2(150.0, 64.0);
    }
    let transcript = if show_transcript && !snap.turns.is_empty() {
        150.0
    } else {
        0.0
    };
    let note = if hosted_audio_note(snap).is_some() { 18.0 } else { 0.0 };
    egui::vec2(320.0, 330.0 + transcript + note)
}

fn status_color(snap: &PanelSnapshot) -> egui::Color32 {
    match snap.state {
        SessionState::Error => WARNING,
        SessionState::Idle => MUTED,
        _ => NEON_LIME,
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for AssistantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let snap = self.snapshot();

        self.pulse_phase = (self.pulse_phase + 0.12) % std::f32::consts::TAU;
        if let Some(outer) = ctx.input(|i| i.viewport().outer_rect) {
            self.last_position = Some(outer.min);
        }

        // The controller publishes asynchronously; poll for its updates.
        let repaint = if snap.in_call() || snap.state != SessionState::Idle {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(250)
        };
        ctx.request_repaint_after(repaint);
        ctx.send_viewport_cmd(egui::ViewportCommand::InnerSize(window_size(
            &snap,
            self.config.ui.show_transcript,
        )));

        let frame = egui::Frame::new()
            .fill(if snap.open { PANEL_BG } else { egui::Color32::TRANSPARENT })
            .corner_radius(egui::CornerRadius::same(24))
            .inner_margin(egui::Margin::same(14));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            if !snap.open {
                self.draw_launcher(ui);
                return;
            }
            self.draw_header(ui, ctx, &snap);
            self.draw_avatar(ui, &snap);
            self.draw_identity(ui, &snap);
            ui.add_space(10.0);
            self.draw_call_button(ui, &snap);
            self.draw_transcript(ui, &snap);
            ui.add_space(6.0);
            self.draw_message_box(ui, &snap);
        });
    }

    /// Remember where the widget was left.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let Some(pos) = self.last_position else {
            return;
        };
        // Re-read the file so environment credentials are never persisted.
        let mut on_disk = match AppConfig::load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ui: not saving window position: {e}");
                return;
            }
        };
        on_disk.ui.window_position = Some((pos.x, pos.y));
        if let Err(e) = on_disk.save() {
            log::warn!("ui: could not save window position: {e}");
        }
        log::info!("assistant widget closing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TranscriptEntry;

    fn snap(state: SessionState, call: CallMode) -> PanelSnapshot {
        PanelSnapshot {
            open: true,
            state,
            call,
            ..PanelSnapshot::default()
        }
    }

    #[test]
    fn typing_follows_controller_rules() {
        assert!(accepts_typing(&snap(SessionState::Idle, CallMode::None)));
        assert!(accepts_typing(&snap(SessionState::Speaking, CallMode::Local)));
        assert!(!accepts_typing(&snap(SessionState::Thinking, CallMode::None)));
        assert!(!accepts_typing(&snap(SessionState::Listening, CallMode::Local)));
        assert!(!accepts_typing(&snap(SessionState::Speaking, CallMode::Hosted)));
    }

    #[test]
    fn hosted_call_says_audio_is_elsewhere() {
        let hosted = snap(SessionState::Listening, CallMode::Hosted);
        let local = snap(SessionState::Listening, CallMode::Local);
        assert!(hosted_audio_note(&hosted).is_some());
        assert!(hosted_audio_note(&local).is_none());
        assert!(window_size(&hosted, false).y > window_size(&local, false).y);
    }

    #[test]
    fn closed_widget_is_launcher_sized() {
        let mut s = snap(SessionState::Idle, CallMode::None);
        s.open = false;
        assert_eq!(window_size(&s, true), egui::vec2(150.0, 64.0));
    }

    #[test]
    fn transcript_grows_the_panel() {
        let mut s = snap(SessionState::Idle, CallMode::None);
        let bare = window_size(&s, true);
        s.turns.push(TranscriptEntry::new(Role::User, "Hi"));
        assert!(window_size(&s, true).y > bare.y);
        assert_eq!(window_size(&s, false), bare);
    }
}
