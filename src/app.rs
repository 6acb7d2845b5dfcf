// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and UI coordination.
//!
//! This module contains the core application state and handles
//! the main UI layout and event processing.

use crate::config::AppConfig;
use crate::editor::handles::CursorHint;
use crate::editor::interaction::{InteractionMachine, ModeKind, Outcome};
use crate::error::AnnotationError;
use crate::io::ledger::ConfirmLedger;
use crate::io::media;
use crate::io::serialization::{self, AnnotationFormat, SaveOptions, SaveOutcome};
use crate::models::labels::LabelRegistry;
use crate::models::project::ImageSession;
use crate::models::store::AnnotationSet;
use crate::ui::canvas::{self, CanvasEvent, CanvasView};
use crate::ui::dialogs::{self, LabelChooser, Message, SaveChoice};
use crate::ui::inference::InferencePage;
use crate::ui::sync::ViewSync;
use crate::ui::toolbar::{self, Tool, ToolbarAction, ToolbarState};
use crate::ui::{files, properties};
use crate::util::geometry::Viewport;
use egui::{Pos2, Vec2};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

/// Top-level page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Annotate,
    Inference,
}

/// Where the operator wants to go once unsaved changes are dealt with.
#[derive(Debug, Clone, PartialEq)]
enum NavTarget {
    Index(usize),
    Image(PathBuf),
    Folder(PathBuf),
    Quit,
}

enum Modal {
    SavePrompt(NavTarget),
    ConfirmClear,
}

/// Result of background image loading operation.
struct LoadedImageData {
    path: PathBuf,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    annotations: Result<AnnotationSet, AnnotationError>,
}

/// Main application state.
pub struct BoxLabelApp {
    config: AppConfig,
    page: Page,
    current_tool: Tool,
    format: AnnotationFormat,
    labels: LabelRegistry,

    /// Images of the open folder, sorted by name
    files: Vec<PathBuf>,
    current_index: Option<usize>,
    ledger: Option<ConfirmLedger>,
    reveal_current_file: bool,

    /// The image on screen and its annotations
    session: Option<ImageSession>,
    image_texture: Option<egui::TextureHandle>,
    viewport: Viewport,
    canvas_size: Vec2,
    needs_fit: bool,

    machine: InteractionMachine,
    sync: ViewSync,
    cursor: CursorHint,
    pointer: Option<Pos2>,
    /// Green background after a save, until the next change
    saved: bool,

    label_chooser: Option<LabelChooser>,
    modal: Option<Modal>,
    message: Option<Message>,
    quit_confirmed: bool,

    /// Receiver for background image loading
    image_loader: Option<Receiver<Result<LoadedImageData, String>>>,
    loading_message: Option<String>,

    inference: InferencePage,
}

impl BoxLabelApp {
    pub fn new(config: AppConfig) -> Self {
        let labels = match LabelRegistry::load(&config.predefined_classes) {
            Ok(labels) => labels,
            Err(e) => {
                log::warn!("{}", e);
                LabelRegistry::new()
            }
        };
        let mut machine = InteractionMachine::new(config.handle_size, config.min_box_size);
        machine.set_use_default_label(config.default_label_mode);

        Self {
            page: Page::Annotate,
            current_tool: Tool::Select,
            format: config.default_format,
            labels,
            files: Vec::new(),
            current_index: None,
            ledger: None,
            reveal_current_file: false,
            session: None,
            image_texture: None,
            viewport: Viewport::default(),
            canvas_size: Vec2::ZERO,
            needs_fit: false,
            machine,
            sync: ViewSync::new(),
            cursor: CursorHint::Neutral,
            pointer: None,
            saved: false,
            label_chooser: None,
            modal: None,
            message: None,
            quit_confirmed: false,
            image_loader: None,
            loading_message: None,
            inference: InferencePage::new(&config.detector),
            config,
        }
    }

    fn save_options(&self) -> SaveOptions {
        SaveOptions {
            scale_factor: self.viewport.scale_factor(),
            write_dataset_yaml: self.config.write_dataset_yaml,
        }
    }

    fn is_blocked(&self) -> bool {
        self.modal.is_some() || self.message.is_some() || self.label_chooser.is_some()
    }

    fn show_error(&mut self, e: &AnnotationError) {
        log::warn!("{}", e);
        self.message = Some(Message::from(e));
    }

    // ---- navigation ----

    /// Go to `target`, asking first if the current image has unsaved changes.
    fn request_navigation(&mut self, target: NavTarget, ctx: &egui::Context) {
        if self.session.as_ref().is_some_and(ImageSession::is_dirty) {
            self.modal = Some(Modal::SavePrompt(target));
        } else {
            self.perform_navigation(target, ctx);
        }
    }

    fn perform_navigation(&mut self, target: NavTarget, ctx: &egui::Context) {
        match target {
            NavTarget::Index(i) => {
                if let Some(path) = self.files.get(i).cloned() {
                    self.current_index = Some(i);
                    self.reveal_current_file = true;
                    self.load_image_file(path);
                }
            }
            NavTarget::Image(path) => self.open_image(path),
            NavTarget::Folder(dir) => self.open_folder(dir),
            NavTarget::Quit => {
                self.quit_confirmed = true;
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn step(&mut self, delta: isize, ctx: &egui::Context) {
        let Some(current) = self.current_index else {
            self.message = Some(Message::warning("Open an image or a folder first"));
            return;
        };
        let next = current as isize + delta;
        if next < 0 {
            self.message = Some(Message::error("This is the first image"));
        } else if next as usize >= self.files.len() {
            self.message = Some(Message::error("This is the last image"));
        } else {
            self.request_navigation(NavTarget::Index(next as usize), ctx);
        }
    }

    fn open_ledger(&mut self, folder: &Path) {
        let listing = match media::list_images(folder, media::ANNOTATE_EXTENSIONS) {
            Ok(listing) => listing,
            Err(e) => {
                log::warn!("{:#}", e);
                return;
            }
        };
        match ConfirmLedger::open(folder, &listing) {
            Ok(ledger) => self.ledger = Some(ledger),
            Err(e) => {
                self.ledger = None;
                self.show_error(&e);
            }
        }
    }

    fn open_image(&mut self, path: PathBuf) {
        let folder = serialization::image_dir(&path);
        self.files = vec![path];
        self.open_ledger(&folder);
        self.current_index = Some(0);
        self.reveal_current_file = true;
        self.load_image_file(self.files[0].clone());
    }

    fn open_folder(&mut self, dir: PathBuf) {
        match media::list_images(&dir, media::ANNOTATE_EXTENSIONS) {
            Ok(files) if files.is_empty() => {
                self.message = Some(Message::warning(format!("No images in {}", dir.display())));
            }
            Ok(files) => {
                log::info!("Opened folder {} with {} images", dir.display(), files.len());
                self.files = files;
                self.open_ledger(&dir);
                self.current_index = Some(0);
                self.reveal_current_file = true;
                self.load_image_file(self.files[0].clone());
            }
            Err(e) => {
                log::error!("{:#}", e);
                self.message = Some(Message::error(format!("{:#}", e)));
            }
        }
    }

    /// Load an image file and its annotations (asynchronously).
    fn load_image_file(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.loading_message = Some(format!("Loading {}...", path.display()));
        self.machine.reset();
        self.label_chooser = None;

        let format = self.format;
        let labels = self.labels.clone();

        // Spawn background thread for loading
        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedImageData, String> {
                let loaded_img = media::load_image(&path).map_err(|e| format!("{:#}", e))?;
                log::info!("Loaded image: {} ({}x{})", path.display(), loaded_img.width, loaded_img.height);
                let annotations = serialization::load(&path, (loaded_img.width, loaded_img.height), format, &labels);
                Ok(LoadedImageData {
                    path,
                    width: loaded_img.width,
                    height: loaded_img.height,
                    pixels: loaded_img.pixels,
                    annotations,
                })
            })();

            let _ = sender.send(result);
        });
    }

    fn receive_loaded_image(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.image_loader else {
            return;
        };
        let Ok(result) = receiver.try_recv() else {
            return;
        };
        self.image_loader = None;
        self.loading_message = None;

        match result {
            Ok(loaded) => {
                // Create egui texture from the loaded image data
                let size = [loaded.width as usize, loaded.height as usize];
                let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &loaded.pixels);
                self.image_texture = Some(ctx.load_texture("loaded_image", color_image, egui::TextureOptions::LINEAR));

                let mut session = ImageSession::new(loaded.path, loaded.width, loaded.height);
                match loaded.annotations {
                    Ok(set) => session.annotations = set,
                    Err(e) => self.show_error(&e),
                }
                self.session = Some(session);
                self.saved = false;
                self.needs_fit = true;
                self.sync.highlight(&AnnotationSet::new(), None);
                self.rebuild_view();
            }
            Err(e) => {
                log::error!("Failed to load image: {}", e);
                self.message = Some(Message::error(e));
            }
        }
    }

    /// Re-read annotations in the newly selected format.
    fn reload_annotations(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.is_dirty() {
            return;
        }
        let result = serialization::load(session.image_path(), session.image_size(), self.format, &self.labels);
        match result {
            Ok(set) => session.annotations = set,
            Err(e) => {
                session.annotations = AnnotationSet::new();
                self.show_error(&e);
            }
        }
        self.rebuild_view();
    }

    // ---- editing ----

    fn rebuild_view(&mut self) {
        if let Some(session) = &self.session {
            self.sync.rebuild(&session.annotations, &self.viewport);
        }
    }

    fn save_current(&mut self) -> bool {
        let options = self.save_options();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match serialization::save(session, self.format, &self.labels, options) {
            Ok(outcome) => {
                if let SaveOutcome::Written(path) | SaveOutcome::Deleted(path) = &outcome {
                    log::debug!("Save touched {}", path.display());
                }
                self.saved = true;
                true
            }
            Err(e) => {
                self.show_error(&e);
                false
            }
        }
    }

    fn confirm_current(&mut self) {
        let Some(path) = self.session.as_ref().map(|s| s.image_path.clone()) else {
            return;
        };
        let Some(ledger) = self.ledger.as_mut() else {
            return;
        };
        if let Err(e) = ledger.confirm(&path) {
            self.show_error(&e);
        }
    }

    fn delete_selected(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.sync.highlighted() {
            Some(id) => {
                if let Some(removed) = session.annotations.remove(id) {
                    log::info!("Deleted '{}', total: {}", removed.label, session.annotations.len());
                    self.sync.refresh(&session.annotations, &self.viewport, id);
                    self.saved = false;
                }
            }
            None => self.message = Some(Message::warning("No annotation selected")),
        }
    }

    fn request_clear(&mut self) {
        if self.session.as_ref().is_some_and(|s| !s.annotations.is_empty()) {
            self.modal = Some(Modal::ConfirmClear);
        }
    }

    fn clear_all(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.annotations.clear();
            log::info!("Cleared all annotations of {}", session.file_name());
            self.saved = false;
        }
        self.rebuild_view();
    }

    fn zoom_to(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.rebuild_view();
    }

    fn zoom_by(&mut self, delta: f32) {
        if let Some(size) = self.session.as_ref().map(ImageSession::image_size) {
            self.zoom_to(self.viewport.zoomed(delta, self.canvas_size, size));
        }
    }

    fn fit_to_window(&mut self) {
        if let Some(size) = self.session.as_ref().map(ImageSession::image_size) {
            self.zoom_to(Viewport::fit_to_window(self.canvas_size, size));
        }
    }

    fn actual_size(&mut self) {
        if let Some(size) = self.session.as_ref().map(ImageSession::image_size) {
            self.zoom_to(Viewport::centered(1.0, self.canvas_size, size));
        }
    }

    fn handle_canvas_events(&mut self, events: Vec<CanvasEvent>) {
        let mut outcomes = Vec::new();
        for event in events {
            if let CanvasEvent::Zoom(direction) = event {
                // Live gesture geometry is in display space; rescaling under it
                // would move the box on release.
                if self.machine.mode() == ModeKind::Select {
                    self.zoom_by(direction * self.config.zoom_step);
                }
                continue;
            }
            let Some(session) = self.session.as_mut() else {
                return;
            };
            let image_size = session.image_size();
            match event {
                CanvasEvent::Press(p) => {
                    outcomes.push(self.machine.press(p, &session.annotations, &self.viewport, image_size));
                }
                CanvasEvent::Drag(p) => {
                    outcomes.push(self.machine.drag(p));
                    if let Some((id, rect)) = self.machine.active_edit() {
                        self.sync.preview(id, rect);
                    }
                }
                CanvasEvent::Release(p) => {
                    outcomes.push(self.machine.release(p, &mut session.annotations, &self.viewport, &mut self.labels));
                }
                CanvasEvent::Click(p) => {
                    outcomes.push(self.machine.press(p, &session.annotations, &self.viewport, image_size));
                    outcomes.push(self.machine.release(p, &mut session.annotations, &self.viewport, &mut self.labels));
                }
                CanvasEvent::Hover(p) => {
                    self.pointer = Some(p);
                    self.cursor = self.machine.hover(p, &session.annotations, &self.viewport);
                }
                CanvasEvent::Zoom(_) => {}
            }
        }
        for outcome in outcomes {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: Outcome) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let set = &session.annotations;
        match outcome {
            Outcome::Idle | Outcome::Preview | Outcome::Discarded => {}
            Outcome::Selected(id) => {
                self.sync.highlight(set, id);
            }
            Outcome::Added(id) | Outcome::Updated(id) => {
                self.sync.refresh(set, &self.viewport, id);
                if set.is_dirty() {
                    self.saved = false;
                }
            }
            Outcome::LabelRequested(_) => {
                self.label_chooser = Some(LabelChooser::open(&self.labels));
            }
            Outcome::Rejected(reason) => {
                self.sync.rebuild(set, &self.viewport);
                self.message = Some(Message::warning(reason));
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() || self.is_blocked() || self.page != Page::Annotate {
            return;
        }
        use egui::Key;
        let pressed = |key: Key| ctx.input(|i| i.key_pressed(key));

        if pressed(Key::W) && self.session.is_some() {
            self.current_tool = Tool::Rectangle;
        }
        if pressed(Key::Space) {
            self.save_current();
        }
        if pressed(Key::Delete) {
            self.delete_selected();
        }
        if pressed(Key::Escape) {
            self.machine.cancel();
            self.current_tool = Tool::Select;
            if let Some(session) = &self.session {
                self.sync.highlight(&session.annotations, None);
                self.sync.rebuild(&session.annotations, &self.viewport);
            }
        }
        if pressed(Key::ArrowLeft) || pressed(Key::A) {
            self.step(-1, ctx);
        }
        if pressed(Key::ArrowRight) || pressed(Key::D) {
            self.step(1, ctx);
        }
    }

    fn handle_toolbar_action(&mut self, action: ToolbarAction, ctx: &egui::Context) {
        match action {
            ToolbarAction::None => {}
            ToolbarAction::Previous => self.step(-1, ctx),
            ToolbarAction::Next => self.step(1, ctx),
            ToolbarAction::Save => {
                self.save_current();
            }
            ToolbarAction::Confirm => self.confirm_current(),
            ToolbarAction::DeleteSelected => self.delete_selected(),
            ToolbarAction::ClearAll => self.request_clear(),
            ToolbarAction::ZoomIn => self.zoom_by(self.config.zoom_step),
            ToolbarAction::ZoomOut => self.zoom_by(-self.config.zoom_step),
            ToolbarAction::FitToWindow => self.fit_to_window(),
            ToolbarAction::ActualSize => self.actual_size(),
        }
    }

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(msg) = &self.message {
            if dialogs::message(ctx, msg) {
                self.message = None;
            }
            return;
        }

        if let Some(mut chooser) = self.label_chooser.take() {
            match chooser.show(ctx, &self.labels) {
                Some(choice) => {
                    if let Some(session) = self.session.as_mut() {
                        let outcome = self.machine.resolve_label(choice, &mut session.annotations, &mut self.labels);
                        self.apply_outcome(outcome);
                    }
                }
                None => self.label_chooser = Some(chooser),
            }
            return;
        }

        match self.modal.take() {
            Some(Modal::SavePrompt(target)) => {
                let name = self.session.as_ref().map(ImageSession::file_name).unwrap_or_default();
                match dialogs::save_prompt(ctx, &name) {
                    Some(SaveChoice::Save) => {
                        if self.save_current() {
                            self.perform_navigation(target, ctx);
                        }
                    }
                    Some(SaveChoice::Discard) => {
                        if let Some(session) = self.session.as_mut() {
                            log::info!("Discarded changes to {}", session.file_name());
                            session.annotations.mark_clean();
                        }
                        self.perform_navigation(target, ctx);
                    }
                    Some(SaveChoice::Cancel) => {}
                    None => self.modal = Some(Modal::SavePrompt(target)),
                }
            }
            Some(Modal::ConfirmClear) => {
                let count = self.session.as_ref().map_or(0, |s| s.annotations.len());
                match dialogs::confirm(ctx, "Clear all", &format!("Delete all {} annotations?", count)) {
                    Some(true) => self.clear_all(),
                    Some(false) => {}
                    None => self.modal = Some(Modal::ConfirmClear),
                }
            }
            None => {}
        }
    }

    fn status_text(&self) -> String {
        let Some(session) = &self.session else {
            return "No image loaded".to_string();
        };
        let (w, h) = session.image_size();
        let scale = self.viewport.scale_factor();
        let mut status = format!(
            "{} | {}x{} -> {:.0}x{:.0} | zoom {:.0}% | {} annotations",
            session.file_name(),
            w,
            h,
            w as f32 * scale,
            h as f32 * scale,
            scale * 100.0,
            session.annotations.len(),
        );
        if session.is_dirty() {
            status.push_str(" | modified");
        }
        if self.machine.pending_label().is_some() {
            status.push_str(" | choose a label");
        }
        if let (Some(p), ModeKind::Select) = (self.pointer, self.machine.mode()) {
            let (ix, iy) = self.viewport.display_to_pixel(p);
            status.push_str(&format!(" | display ({:.0}, {:.0}) image ({}, {})", p.x, p.y, ix, iy));
        }
        status
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", media::ANNOTATE_EXTENSIONS)
                            .pick_file()
                        {
                            self.request_navigation(NavTarget::Image(path), ctx);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Open Folder...").clicked() {
                        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                            self.request_navigation(NavTarget::Folder(dir), ctx);
                        }
                        ui.close_menu();
                    }
                    if ui.add_enabled(self.session.is_some(), egui::Button::new("Save (Space)")).clicked() {
                        self.save_current();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        self.request_navigation(NavTarget::Quit, ctx);
                        ui.close_menu();
                    }
                });

                ui.menu_button("Page", |ui| {
                    if ui.radio_value(&mut self.page, Page::Annotate, "Annotate").clicked() {
                        ui.close_menu();
                    }
                    if ui.radio_value(&mut self.page, Page::Inference, "Pre-annotate").clicked() {
                        ui.close_menu();
                    }
                });

                ui.menu_button("Edit", |ui| {
                    let has_selection = self.sync.highlighted().is_some();
                    if ui.add_enabled(has_selection, egui::Button::new("Delete Selected")).clicked() {
                        self.delete_selected();
                        ui.close_menu();
                    }
                    if ui.button("Clear All...").clicked() {
                        self.request_clear();
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Zoom In").clicked() {
                        self.zoom_by(self.config.zoom_step);
                        ui.close_menu();
                    }
                    if ui.button("Zoom Out").clicked() {
                        self.zoom_by(-self.config.zoom_step);
                        ui.close_menu();
                    }
                    if ui.button("Fit to Window").clicked() {
                        self.fit_to_window();
                        ui.close_menu();
                    }
                    if ui.button("Actual Size").clicked() {
                        self.actual_size();
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_annotate_page(&mut self, ctx: &egui::Context) {
        // Toolbar
        let previous_format = self.format;
        let mut default_label = self.machine.use_default_label();
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                toolbar::show(
                    ui,
                    ToolbarState {
                        tool: &mut self.current_tool,
                        format: &mut self.format,
                        default_label: &mut default_label,
                        has_image: self.session.is_some(),
                    },
                )
            })
            .inner;
        self.machine.set_use_default_label(default_label);
        if self.format != previous_format {
            log::info!("Annotation format set to {}", self.format.name());
            self.reload_annotations();
        }
        self.handle_toolbar_action(toolbar_action, ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.label(self.status_text());
        });

        // File list (left side)
        let clicked_file = egui::SidePanel::left("files")
            .default_width(200.0)
            .show(ctx, |ui| {
                files::show(
                    ui,
                    &self.files,
                    self.current_index,
                    self.ledger.as_ref(),
                    self.reveal_current_file,
                )
            })
            .inner;
        self.reveal_current_file = false;
        if let Some(i) = clicked_file {
            self.request_navigation(NavTarget::Index(i), ctx);
        }

        // Properties panel (right side)
        let selected_row = self.session.as_ref().and_then(|s| self.sync.selected_row(&s.annotations));
        let properties_action = egui::SidePanel::right("properties")
            .default_width(260.0)
            .show(ctx, |ui| properties::show(ui, &mut self.labels, &self.sync, selected_row))
            .inner;
        match properties_action {
            properties::PropertiesAction::SelectRow(row) => {
                if let Some(session) = &self.session {
                    if let Some(id) = self.sync.select_row(&session.annotations, row) {
                        log::debug!("Selected {:?} from list", id);
                    }
                }
            }
            properties::PropertiesAction::DeleteSelected => self.delete_selected(),
            properties::PropertiesAction::None => {}
        }

        // Main canvas (center)
        self.machine.request_draw(self.current_tool == Tool::Rectangle);
        let output = egui::CentralPanel::default()
            .show(ctx, |ui| {
                if let Some(ref message) = self.loading_message {
                    ui.centered_and_justified(|ui| {
                        ui.vertical_centered(|ui| {
                            ui.add_space(20.0);
                            ui.spinner();
                            ui.add_space(10.0);
                            ui.label(egui::RichText::new(message).size(16.0).color(egui::Color32::from_gray(200)));
                        });
                    });
                    None
                } else {
                    let view = CanvasView {
                        texture: self.image_texture.as_ref(),
                        image_size: self.session.as_ref().map(ImageSession::image_size),
                        viewport: &self.viewport,
                        sync: &self.sync,
                        rubber_band: self.machine.rubber_band(),
                        handle_size: self.config.handle_size,
                        saved: self.saved,
                        cursor: self.cursor,
                    };
                    Some(canvas::show(ui, &view))
                }
            })
            .inner;

        if let Some(output) = output {
            self.canvas_size = output.size;
            if self.needs_fit && self.canvas_size.x > 1.0 && self.canvas_size.y > 1.0 {
                self.needs_fit = false;
                self.fit_to_window();
            }
            if !self.is_blocked() {
                self.handle_canvas_events(output.events);
            }
        }
        if self.current_tool == Tool::Rectangle && !self.machine.draw_requested() {
            self.current_tool = Tool::Select;
        }
    }
}

impl eframe::App for BoxLabelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Check for completed image loading
        self.receive_loaded_image(ctx);

        // Request repaint if still loading (to update spinner)
        if self.loading_message.is_some() {
            ctx.request_repaint();
        }

        if ctx.input(|i| i.viewport().close_requested()) && !self.quit_confirmed {
            if self.session.as_ref().is_some_and(ImageSession::is_dirty) {
                ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
                self.modal = Some(Modal::SavePrompt(NavTarget::Quit));
            }
        }

        self.show_menu(ctx);
        self.handle_shortcuts(ctx);

        match self.page {
            Page::Annotate => self.show_annotate_page(ctx),
            Page::Inference => {
                let options = self.save_options();
                egui::CentralPanel::default().show(ctx, |ui| self.inference.show(ui, options));
            }
        }

        // One image per frame keeps the UI responsive during batch inference.
        if self.inference.tick(&mut self.labels) {
            ctx.request_repaint();
        }

        self.show_dialogs(ctx);
    }
}
