use eframe::egui;
use shared::{BackendClient, Config};

use crate::views::{ConverterView, LearnView, YoutubeView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Converter,
    Youtube,
    Learn,
}

/// Top-level application state: one tab strip, three independent views.
/// Each view owns its own controllers and tears them down on reset.
pub struct SignBridgeApp {
    tab: Tab,
    converter: ConverterView,
    youtube: YoutubeView,
    learn: LearnView,
}

impl SignBridgeApp {
    pub fn new(client: BackendClient, config: Config) -> Self {
        Self {
            tab: Tab::Converter,
            converter: ConverterView::new(client.clone()),
            youtube: YoutubeView::new(client.clone()),
            learn: LearnView::new(client, config),
        }
    }
}

impl eframe::App for SignBridgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("SignBridge");
                ui.separator();
                ui.selectable_value(&mut self.tab, Tab::Converter, "Convert to Sign");
                ui.selectable_value(&mut self.tab, Tab::Youtube, "YouTube Converter");
                ui.selectable_value(&mut self.tab, Tab::Learn, "Learn ASL");
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| match self.tab {
                Tab::Converter => self.converter.ui(ui),
                Tab::Youtube => self.youtube.ui(ui),
                Tab::Learn => self.learn.ui(ui),
            });
        });
    }
}
