//! Top bar UI: app title, unit and status.

use super::colors;
use eframe::egui::{self, Color32, RichText};
use tactimap::TacticalEngine;

/// Severity of the status line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusLevel {
    #[default]
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct Status {
    pub message: String,
    pub level: StatusLevel,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: StatusLevel::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: StatusLevel::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: StatusLevel::Error,
        }
    }
}

pub fn render_top_bar(ctx: &egui::Context, engine: &TacticalEngine, status: &Status) {
    egui::TopBottomPanel::top("top_bar")
        .exact_height(36.0)
        .show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.label(
                    RichText::new("Tactimap")
                        .strong()
                        .size(16.0)
                        .color(Color32::WHITE),
                );

                if let Some(unit) = engine.unit() {
                    ui.separator();
                    ui.label(RichText::new("Unit:").size(12.0).color(Color32::GRAY));
                    ui.label(RichText::new(unit.to_string()).monospace().size(12.0));
                }

                ui.separator();

                let color = match status.level {
                    StatusLevel::Info => Color32::GRAY,
                    StatusLevel::Success => colors::ui::SUCCESS,
                    StatusLevel::Error => colors::ui::ERROR,
                };
                ui.label(RichText::new(&status.message).size(13.0).color(color));
            });
        });
}
