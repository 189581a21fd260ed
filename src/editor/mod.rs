//! The QC canvas editor.
//!
//! [`QcEditor`] owns the shape store, the interaction controller, the
//! selection bridge and the save coordinator for one canvas, and is the only
//! thing a host talks to. Input arrives in screen coordinates; output comes
//! back as a [`RenderFrame`], a [`PanelView`] and a queue of [`EditorEvent`]s.
//!
//! Saving is two-phase: `request_save` / `switch_image` / `teardown` return
//! a [`SaveRequest`] for the host to write, and the host reports back with
//! [`QcEditor::complete_save`]. [`QcEditor::open_image`] and
//! [`QcEditor::save_with`] do both steps against a blocking
//! [`AnnotationPersistence`].

mod render;


pub use render::{CreationPreview, Outline, RenderFrame, RenderedShape};

use std::rc::Rc;

use web_time::Instant;

use crate::config::AppConfig;
use crate::constants::DEFAULT_ZOOM_STEP;
use crate::coords::{DisplayGeometry, ElementRect, NaturalSize, Point};
use crate::format::{AnnotationCodec, AnnotationDocument, ImageMeta, codec_for};
use crate::interaction::{
    InteractionController, InteractionEvent, InteractionState, PointerCapture, Viewport,
};
use crate::keybindings::{EditorAction, KeyBindings};
use crate::model::{
    AttributeSchema, GeometryError, ImageRef, QcMode, ResolvedAttribute, ShapeData, ShapeKey,
};
use crate::persistence::{AnnotationPersistence, ClassNameSource, PersistenceError};
use crate::state::{
    Provenance, SaveCoordinator, SaveOutcome, SaveRequest, SaveSource, SaveStatus, SaveTicket,
    SaveTrigger, SelectionBridge, ShapeStore,
};
use crate::zoom_math::ZoomPan;

/// Notifications for the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// First committed edit on an image since it was loaded or saved
    ImageEdited(String),
    /// Canvas-originated selection the attribute panel has to follow
    SelectionChanged { index: Option<usize> },
    /// A new shape needs a label; `suggestions` feeds the autocomplete
    LabelRequested { suggestions: Vec<String> },
    AnnotationLoaded { image: String, shapes: usize },
    /// The annotation file could not be parsed; editing starts from an empty store
    ParseFailed { image: String, error: String },
    /// A write finished; `content` is the new canonical annotation payload
    Saved { image: String, content: String },
    SaveFailed { image: String, error: String },
}

/// Row of the attribute panel's shape list.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelShape {
    pub index: usize,
    pub name: String,
    pub kind: &'static str,
}

/// What the attribute panel displays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelView {
    pub selected: Option<usize>,
    pub shapes: Vec<PanelShape>,
    /// Schema attributes of the selected shape, defaults merged in
    pub attributes: Vec<ResolvedAttribute>,
}

pub struct QcEditor {
    mode: QcMode,
    codec: &'static dyn AnnotationCodec,
    image: Option<ImageRef>,
    baseline: Option<AnnotationDocument>,
    natural: Option<NaturalSize>,
    element: Option<ElementRect>,
    geometry: Option<DisplayGeometry>,
    zoom_pan: ZoomPan,
    zoom_step: f64,
    store: ShapeStore,
    controller: InteractionController,
    bridge: SelectionBridge,
    saves: SaveCoordinator,
    schema: AttributeSchema,
    keybindings: KeyBindings,
    class_names: Vec<String>,
    edited_reported: bool,
    save_after_drag: bool,
    outbox: Vec<SaveRequest>,
    events: Vec<EditorEvent>,
}

impl QcEditor {
    pub fn new(mode: QcMode) -> Self {
        Self {
            mode,
            codec: codec_for(mode),
            image: None,
            baseline: None,
            natural: None,
            element: None,
            geometry: None,
            zoom_pan: ZoomPan::identity(),
            zoom_step: DEFAULT_ZOOM_STEP,
            store: ShapeStore::new(),
            controller: InteractionController::new(),
            bridge: SelectionBridge::new(),
            saves: SaveCoordinator::new(),
            schema: AttributeSchema::default(),
            keybindings: KeyBindings::default(),
            class_names: Vec::new(),
            edited_reported: false,
            save_after_drag: false,
            outbox: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let prefs = &config.preferences;
        let mut editor = Self::new(prefs.qc_mode);
        editor.zoom_step = prefs.zoom_step;
        editor.controller = InteractionController::new().with_throttle(prefs.drag_throttle());
        editor.saves = SaveCoordinator::new().with_status_duration(prefs.save_status_duration());
        editor.schema = config.attributes.clone();
        editor.keybindings = config.keybindings.clone();
        editor
    }

    /// Route pointer capture for drags through the host.
    pub fn with_capture(mut self, capture: Rc<dyn PointerCapture>) -> Self {
        self.controller = self.controller.with_capture(capture);
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn mode(&self) -> QcMode {
        self.mode
    }

    pub fn image(&self) -> Option<&ImageRef> {
        self.image.as_ref()
    }

    pub fn store(&self) -> &ShapeStore {
        &self.store
    }

    pub fn state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn zoom_pan(&self) -> ZoomPan {
        self.zoom_pan
    }

    pub fn geometry(&self) -> Option<&DisplayGeometry> {
        self.geometry.as_ref()
    }

    pub fn baseline(&self) -> Option<&AnnotationDocument> {
        self.baseline.as_ref()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.controller
            .selected()
            .and_then(|key| self.store.index_of(key))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.store.has_unsaved_changes()
    }

    pub fn save_status(&self, now: Instant) -> SaveStatus {
        self.saves.status(now)
    }

    pub fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Save requests that became ready outside a direct save call.
    pub fn take_save_requests(&mut self) -> Vec<SaveRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Size, fit and zoom, once both the image and the element layout are known.
    pub fn viewport(&self) -> Option<Viewport> {
        Some(Viewport::new(self.natural?, self.geometry?, self.zoom_pan))
    }

    // ========================================================================
    // Image lifecycle
    // ========================================================================

    /// Leave the current image and make `image` current.
    ///
    /// Pending edits of the outgoing image are serialized before the store is
    /// cleared; the returned request carries them. The new image starts empty
    /// until [`QcEditor::load_annotation`] is called.
    pub fn switch_image(&mut self, image: ImageRef, now: Instant) -> Option<SaveRequest> {
        self.controller.reset(&mut self.store);
        self.save_after_drag = false;
        let flush = self.request_or_report(SaveTrigger::ImageSwitch, now);

        log::info!("Switching to image {}", image.name);
        self.store.clear();
        self.baseline = None;
        self.natural = None;
        self.geometry = None;
        self.zoom_pan.reset();
        self.bridge.reset();
        self.edited_reported = false;
        self.image = Some(image);
        flush
    }

    /// Parse the annotation document of the current image. `None` or blank content means no file yet.
    pub fn load_annotation(&mut self, raw: Option<&str>) {
        let image = self.image_name();
        let raw = raw.filter(|content| !content.trim().is_empty());
        let Some(raw) = raw else {
            log::info!("No annotations for {}, starting empty", image);
            self.replace_contents(None, Vec::new());
            self.events.push(EditorEvent::AnnotationLoaded { image, shapes: 0 });
            return;
        };

        match self.codec.parse(raw) {
            Ok(parsed) => {
                let count = parsed.shapes.len();
                log::info!("Loaded {} shapes for {}", count, image);
                self.replace_contents(Some(parsed.document), parsed.shapes);
                self.events
                    .push(EditorEvent::AnnotationLoaded { image, shapes: count });
            }
            Err(e) => {
                log::warn!("Failed to parse annotations for {}: {}", image, e);
                self.replace_contents(None, Vec::new());
                self.events.push(EditorEvent::ParseFailed {
                    image,
                    error: e.to_string(),
                });
            }
        }
    }

    fn replace_contents(
        &mut self,
        baseline: Option<AnnotationDocument>,
        shapes: Vec<ShapeData>,
    ) {
        self.controller.reset(&mut self.store);
        self.bridge.reset();
        self.baseline = baseline;
        self.store.load(shapes);
        self.edited_reported = false;
    }

    /// Switch to `image`, flushing the outgoing one and reading the new annotation file.
    pub fn open_image(
        &mut self,
        image: ImageRef,
        persistence: &dyn AnnotationPersistence,
        now: Instant,
    ) -> Result<(), PersistenceError> {
        if let Some(request) = self.switch_image(image, now) {
            self.write_all(request, persistence, now);
        }
        let raw = match self.image.as_ref().and_then(|i| i.annotation_path.clone()) {
            Some(path) => persistence.read_annotation(&path)?,
            None => None,
        };
        self.load_annotation(raw.as_deref());
        Ok(())
    }

    /// Image element finished loading.
    pub fn set_natural_size(&mut self, natural: NaturalSize) {
        if !natural.is_valid() {
            log::warn!("Ignoring invalid natural size {:?}", natural);
            return;
        }
        self.natural = Some(natural);
        self.refit();
    }

    /// The image element moved or changed size.
    pub fn relayout(&mut self, element: ElementRect) {
        self.element = Some(element);
        self.refit();
    }

    fn refit(&mut self) {
        let (Some(natural), Some(element)) = (self.natural, self.element) else {
            return;
        };
        self.geometry = DisplayGeometry::fit(element, natural);
        if let Some(geometry) = &self.geometry {
            self.zoom_pan = self.zoom_pan.clamp_pan(geometry);
        }
    }

    /// Flush pending edits before the canvas goes away.
    pub fn teardown(&mut self, now: Instant) -> Option<SaveRequest> {
        self.controller.reset(&mut self.store);
        self.save_after_drag = false;
        self.request_or_report(SaveTrigger::Teardown, now)
    }

    // ========================================================================
    // Pointer and keyboard input
    // ========================================================================

    pub fn pointer_down(&mut self, screen: Point, now: Instant) {
        let Some(view) = self.viewport() else {
            return;
        };
        self.controller.pointer_down(screen, &self.store, &view, now);
        self.drain_controller();
    }

    pub fn pointer_move(&mut self, screen: Point, now: Instant) {
        let Some(mut view) = self.viewport() else {
            return;
        };
        self.controller
            .pointer_move(screen, &mut self.store, &mut view, now);
        self.zoom_pan = view.zoom_pan;
    }

    pub fn pointer_up(&mut self, screen: Point, now: Instant) {
        let Some(mut view) = self.viewport() else {
            return;
        };
        self.controller.pointer_up(screen, &mut self.store, &mut view);
        self.zoom_pan = view.zoom_pan;
        self.drain_controller();
        self.run_deferred_save(now);
    }

    pub fn double_click(&mut self, screen: Point) {
        let Some(view) = self.viewport() else {
            return;
        };
        self.controller.double_click(screen, &view);
        self.drain_controller();
    }

    /// Handle a key press. Returns true if the key was used.
    pub fn key_down(&mut self, key: &str, now: Instant) -> bool {
        let Some(action) = self.keybindings.action_for_key(key) else {
            return false;
        };
        // While a label is being typed only Escape reaches the canvas
        if self.controller.state() == InteractionState::AwaitingLabel
            && action != EditorAction::Cancel
        {
            return false;
        }
        match action {
            EditorAction::StartCreation => self.start_creation(),
            EditorAction::Cancel => {
                self.cancel(now);
                true
            }
            EditorAction::Delete => match self.delete_selected() {
                Ok(()) => true,
                Err(e) => {
                    log::debug!("Delete ignored: {}", e);
                    false
                }
            },
        }
    }

    /// Zoom by one step around the cursor. Returns the new zoom level.
    pub fn wheel(&mut self, delta_y: f64, cursor: Point) -> f64 {
        let Some(geometry) = self.geometry else {
            return self.zoom_pan.zoom;
        };
        if delta_y == 0.0 || !self.controller.is_idle() {
            return self.zoom_pan.zoom;
        }
        let step = if delta_y < 0.0 {
            self.zoom_step
        } else {
            -self.zoom_step
        };
        self.zoom_pan = self
            .zoom_pan
            .zoom_to_cursor(self.zoom_pan.zoom + step, cursor, &geometry);
        log::debug!("🔍 Zoom: {:.2}x", self.zoom_pan.zoom);
        self.zoom_pan.zoom
    }

    // ========================================================================
    // Editing commands
    // ========================================================================

    /// Enter creation mode for the QC mode's shape kind.
    pub fn start_creation(&mut self) -> bool {
        if self.viewport().is_none() {
            log::debug!("Cannot create shapes before the image is laid out");
            return false;
        }
        self.controller.start_creation(self.mode)
    }

    /// Escape: abort creation or the active drag without touching committed geometry.
    pub fn cancel(&mut self, now: Instant) {
        match self.viewport() {
            Some(mut view) => {
                self.controller.cancel(&mut self.store, &mut view);
                self.zoom_pan = view.zoom_pan;
            }
            None => self.controller.reset(&mut self.store),
        }
        self.drain_controller();
        self.run_deferred_save(now);
    }

    /// Label the shape waiting in the label step. Returns its index.
    pub fn submit_label(&mut self, name: &str) -> Result<usize, GeometryError> {
        let result = self.controller.submit_label(name, &mut self.store);
        self.drain_controller();
        result
    }

    pub fn rename_shape(&mut self, index: usize, name: &str) -> Result<(), GeometryError> {
        let key = self.key_at(index)?;
        self.store.rename(key, name)?;
        self.report_edit();
        Ok(())
    }

    /// `attributeChanged` from the attribute panel.
    pub fn set_attribute(
        &mut self,
        index: usize,
        attribute: &str,
        value: &str,
    ) -> Result<(), GeometryError> {
        let key = self.key_at(index)?;
        if self.schema.get(attribute).is_none() {
            log::debug!("Attribute {:?} is not in the schema", attribute);
        }
        if self.store.set_attribute(key, attribute, value)? {
            self.report_edit();
        }
        Ok(())
    }

    pub fn delete_selected(&mut self) -> Result<(), GeometryError> {
        let result = self.controller.delete_selected(&mut self.store);
        self.drain_controller();
        result
    }

    pub fn insert_vertex(&mut self, after_index: usize, screen: Point) -> Result<usize, GeometryError> {
        let view = self.viewport().ok_or(GeometryError::UnknownShape)?;
        let result = self
            .controller
            .insert_vertex(after_index, screen, &mut self.store, &view);
        self.drain_controller();
        result
    }

    pub fn delete_vertex(&mut self, index: usize) -> Result<(), GeometryError> {
        let result = self.controller.delete_vertex(index, &mut self.store);
        self.drain_controller();
        result
    }

    fn key_at(&self, index: usize) -> Result<ShapeKey, GeometryError> {
        self.store.key_at(index).ok_or(GeometryError::UnknownShape)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// `objectSelected` from the attribute panel. Returns true if the canvas selection changed.
    pub fn select_from_panel(&mut self, index: Option<usize>) -> bool {
        let key = match index {
            Some(i) => match self.store.key_at(i) {
                Some(key) => Some(key),
                None => {
                    log::debug!("Panel selected unknown shape {}", i);
                    return false;
                }
            },
            None => None,
        };
        if self.bridge.select(key, Provenance::Panel).is_none() {
            return false;
        }
        self.controller.select(key);
        self.drain_controller();
        true
    }

    fn drain_controller(&mut self) {
        for event in self.controller.take_events() {
            match event {
                InteractionEvent::SelectionChanged(key) => {
                    if let Some(notice) = self.bridge.select(key, Provenance::Canvas) {
                        let index = notice.key.and_then(|k| self.store.index_of(k));
                        self.events.push(EditorEvent::SelectionChanged { index });
                    }
                }
                InteractionEvent::Committed(_) | InteractionEvent::Created(_) => {
                    self.report_edit();
                }
                InteractionEvent::Removed(key) => {
                    if self.bridge.forget(key, Provenance::Canvas).is_some() {
                        self.events.push(EditorEvent::SelectionChanged { index: None });
                    }
                    self.report_edit();
                }
                InteractionEvent::LabelRequested => {
                    let suggestions = self.label_suggestions("");
                    self.events.push(EditorEvent::LabelRequested { suggestions });
                }
                InteractionEvent::CreationCancelled => {}
            }
        }
        // Every observer has seen this update
        self.bridge.settle();
    }

    fn report_edit(&mut self) {
        if self.edited_reported {
            return;
        }
        self.edited_reported = true;
        self.events.push(EditorEvent::ImageEdited(self.image_name()));
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Serialize the current image for writing.
    ///
    /// An explicit save during a shape drag is deferred until the drag ends
    /// and then shows up in [`QcEditor::take_save_requests`].
    pub fn request_save(
        &mut self,
        trigger: SaveTrigger,
        now: Instant,
    ) -> Result<Option<SaveRequest>, PersistenceError> {
        if self.controller.is_editing_shape() {
            log::debug!("Save ({:?}) deferred until the drag ends", trigger);
            self.save_after_drag = true;
            return Ok(None);
        }
        let Some(image) = self.image.as_ref() else {
            return Ok(None);
        };
        let meta = image_meta(image, self.natural);
        let source = SaveSource {
            store: &self.store,
            codec: self.codec,
            baseline: self.baseline.as_ref(),
            meta: &meta,
            image: &image.name,
            path: image.annotation_path.as_deref(),
        };
        self.saves.request(trigger, source, now)
    }

    fn request_or_report(&mut self, trigger: SaveTrigger, now: Instant) -> Option<SaveRequest> {
        match self.request_save(trigger, now) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Save ({:?}) failed: {}", trigger, e);
                let image = self.image_name();
                self.events.push(EditorEvent::SaveFailed {
                    image,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn run_deferred_save(&mut self, now: Instant) {
        if !self.save_after_drag || self.controller.is_editing_shape() {
            return;
        }
        self.save_after_drag = false;
        if let Some(request) = self.request_or_report(SaveTrigger::Explicit, now) {
            self.outbox.push(request);
        }
    }

    /// Report the result of writing a [`SaveRequest`]. Returns a follow-up write for the same file, if one was queued.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), PersistenceError>,
        now: Instant,
    ) -> Option<SaveRequest> {
        let completion = self.saves.complete(ticket, result, &mut self.store, now);
        match completion.outcome {
            SaveOutcome::Saved {
                image,
                content,
                current,
                ..
            } => {
                if current {
                    // The written document is the baseline for the next save
                    match self.codec.parse(&content) {
                        Ok(parsed) => self.baseline = Some(parsed.document),
                        Err(e) => log::warn!("Saved document for {} does not parse: {}", image, e),
                    }
                    self.edited_reported = self.store.has_unsaved_changes();
                }
                self.events.push(EditorEvent::Saved { image, content });
            }
            SaveOutcome::Failed { image, error, .. } => {
                self.events.push(EditorEvent::SaveFailed { image, error });
            }
            SaveOutcome::Unknown => {}
        }
        completion.next
    }

    /// Save synchronously through `persistence`. Returns true if anything was written.
    pub fn save_with(
        &mut self,
        persistence: &dyn AnnotationPersistence,
        now: Instant,
    ) -> Result<bool, PersistenceError> {
        match self.request_save(SaveTrigger::Explicit, now)? {
            Some(request) => Ok(self.write_all(request, persistence, now)),
            None => Ok(false),
        }
    }

    /// Re-dispatch failed writes of images no longer loaded.
    pub fn retry_failed_saves(&mut self, now: Instant) -> Vec<SaveRequest> {
        self.saves.retry_failed(now)
    }

    fn write_all(
        &mut self,
        request: SaveRequest,
        persistence: &dyn AnnotationPersistence,
        now: Instant,
    ) -> bool {
        let mut next = Some(request);
        let mut all_ok = true;
        while let Some(request) = next {
            let result = persistence.write_annotation(&request.path, &request.content);
            all_ok &= result.is_ok();
            next = self.complete_save(request.ticket, result, now);
        }
        all_ok
    }

    // ========================================================================
    // Class names
    // ========================================================================

    pub fn set_class_names(&mut self, mut names: Vec<String>) {
        names.sort();
        names.dedup();
        self.class_names = names;
    }

    /// Load autocomplete labels. Failures leave the list empty.
    pub fn load_class_names(&mut self, source: &dyn ClassNameSource) {
        match source.class_names(self.mode) {
            Ok(names) => {
                log::debug!("Loaded {} class names", names.len());
                self.set_class_names(names);
            }
            Err(e) => {
                log::warn!("Class name lookup failed, falling back to free text: {}", e);
                self.class_names.clear();
            }
        }
    }

    /// Known labels starting with `prefix`, ignoring case.
    pub fn label_suggestions(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.trim().to_lowercase();
        self.class_names
            .iter()
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Screen-space overlay. Empty until the natural size and layout are known.
    pub fn render(&self) -> RenderFrame {
        match self.viewport() {
            Some(view) => render::build_frame(&self.store, &self.controller, &view),
            None => RenderFrame {
                zoom_pan: self.zoom_pan,
                ..Default::default()
            },
        }
    }

    pub fn panel_view(&self) -> PanelView {
        let selected = self.controller.selected().and_then(|key| self.store.get(key));
        PanelView {
            selected: self.selected_index(),
            shapes: self
                .store
                .shapes()
                .iter()
                .enumerate()
                .map(|(index, shape)| PanelShape {
                    index,
                    name: shape.name().to_string(),
                    kind: shape.geometry().kind_name(),
                })
                .collect(),
            attributes: selected
                .map(|shape| self.schema.resolve(&shape.data.attributes))
                .unwrap_or_default(),
        }
    }

    fn image_name(&self) -> String {
        self.image
            .as_ref()
            .map(|image| image.name.clone())
            .unwrap_or_default()
    }
}

fn image_meta(image: &ImageRef, natural: Option<NaturalSize>) -> ImageMeta {
    let mut meta = ImageMeta::new(image.name.as_str()).with_natural(natural);
    if let Some(folder) = image
        .full_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|f| f.to_str())
    {
        meta.folder = folder.to_string();
    }
    meta
}
