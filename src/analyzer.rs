//! The analyzer state value: owns the class models, the pack registry, the
//! document store, and the color map, and exposes the whole query surface
//! an editor front end needs.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::check::{self, Budget, CheckOutcome, EpochBudget, Unlimited};
use crate::color::Rgba;
use crate::config::Workspace;
use crate::document::DocumentStore;
use crate::host::{Clock, FileSystem};
use crate::intel::{self, CompletionItem, Hover};
use crate::model::ClassModelManager;
use crate::pack::{self, PackRegistry, QueryCtx};
use crate::{Diagnostic, Location, TextRange};

/// Delay between a content change and the validation it schedules.
pub const VALIDATE_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct Analyzer {
    fs: Box<dyn FileSystem>,
    clock: Box<dyn Clock>,
    models: ClassModelManager,
    registry: PackRegistry,
    docs: DocumentStore,
    /// Bumped on every incoming validation request; stale walks abort.
    epoch: Rc<Cell<u64>>,
    /// uri → deadline of the debounced validation it is waiting for.
    pending: HashMap<String, Instant>,
    colors: HashMap<String, Vec<(TextRange, Rgba)>>,
    platform: Option<&'static str>,
}

impl Analyzer {
    pub fn new(fs: impl FileSystem + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            fs: Box::new(fs),
            clock: Box::new(clock),
            models: ClassModelManager::new(),
            registry: PackRegistry::new(),
            docs: DocumentStore::new(),
            epoch: Rc::new(Cell::new(0)),
            pending: HashMap::new(),
            colors: HashMap::new(),
            platform: pack::current_platform(),
        }
    }

    /// Point the analyzer at a repository: skins locations + class models.
    pub fn configure(&mut self, workspace: &Workspace) {
        self.registry.set_skins_locations(workspace.skins_locations());

        let elements = workspace.skin_elements_model(self.fs.as_ref());
        if let Err(e) = self.models.load_class_model(&elements, self.fs.as_ref()) {
            warn!(error = %e, "skin elements model unavailable");
        }
        let styles = workspace.visual_styles_model(self.fs.as_ref());
        if let Err(e) = self.models.load_style_model(&styles, self.fs.as_ref()) {
            warn!(error = %e, "visual styles model unavailable");
        }
    }

    /// Reload class models from explicit paths (didChangeConfiguration).
    pub fn load_models(&mut self, elements: &Path, styles: &Path) {
        if let Err(e) = self.models.load_class_model(elements, self.fs.as_ref()) {
            warn!(error = %e, "skin elements model unavailable");
        }
        if let Err(e) = self.models.load_style_model(styles, self.fs.as_ref()) {
            warn!(error = %e, "visual styles model unavailable");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.models.is_class_model_loaded()
    }

    pub fn models(&self) -> &ClassModelManager {
        &self.models
    }

    // ─── Document lifecycle ──────────────────────────────────────

    pub fn open_document(&mut self, uri: &str, text: &str) {
        self.docs.open(uri, text);
        self.schedule_validation(uri);
    }

    /// Content change: replaces any validation already scheduled for the
    /// document and bumps the check epoch so in-flight walks abort.
    pub fn document_changed(&mut self, uri: &str, text: &str) {
        self.docs.update(uri, text);
        self.schedule_validation(uri);
    }

    pub fn close_document(&mut self, uri: &str) {
        self.docs.close(uri);
        self.pending.remove(uri);
        self.colors.remove(uri);
    }

    fn schedule_validation(&mut self, uri: &str) {
        self.epoch.set(self.epoch.get() + 1);
        let deadline = self.clock.now() + VALIDATE_DEBOUNCE;
        self.pending.insert(uri.to_string(), deadline);
    }

    /// Documents whose debounce window has expired, ready to validate.
    pub fn due_validations(&mut self) -> Vec<String> {
        let now = self.clock.now();
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(uri, _)| uri.clone())
            .collect();
        for uri in &due {
            self.pending.remove(uri);
        }
        due
    }

    // ─── Queries ─────────────────────────────────────────────────

    fn ctx(&self) -> QueryCtx<'_> {
        QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        }
    }

    /// Validate a document with an unlimited budget.
    pub fn check_document(&mut self, uri: &str) -> Vec<Diagnostic> {
        self.check_document_with(uri, &mut Unlimited).diagnostics
    }

    /// Validate under a caller-supplied budget; partial outcomes keep the
    /// previous color map.
    pub fn check_document_with(&mut self, uri: &str, budget: &mut dyn Budget) -> CheckOutcome {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        let outcome = check::check_document(&mut self.registry, &ctx, uri, budget);
        if outcome.completed {
            self.colors.insert(uri.to_string(), outcome.colors.clone());
        }
        outcome
    }

    /// A budget bound to the current epoch: it aborts once any newer
    /// validation request arrives.
    pub fn epoch_budget(&self) -> EpochBudget {
        EpochBudget { started: self.epoch.get(), current: self.epoch.clone() }
    }

    pub fn find_completions(&mut self, uri: &str, offset: usize) -> Vec<CompletionItem> {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        intel::find_completions(&mut self.registry, &ctx, uri, offset)
    }

    pub fn find_hover(&mut self, uri: &str, offset: usize) -> Option<Hover> {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        intel::find_hover(&mut self.registry, &ctx, uri, offset)
    }

    pub fn find_definitions(&mut self, uri: &str, offset: usize) -> Vec<Location> {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        intel::find_definitions(&mut self.registry, &ctx, uri, offset)
    }

    pub fn find_references(&mut self, uri: &str, offset: usize) -> Vec<Location> {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        intel::find_references(&mut self.registry, &ctx, uri, offset)
    }

    pub fn prepare_rename(&mut self, uri: &str, offset: usize) -> Option<(TextRange, String)> {
        let ctx = self.ctx();
        intel::prepare_rename(&ctx, uri, offset)
    }

    pub fn rename(
        &mut self,
        uri: &str,
        offset: usize,
        new_name: &str,
    ) -> HashMap<String, Vec<(TextRange, String)>> {
        let ctx = QueryCtx {
            fs: self.fs.as_ref(),
            clock: self.clock.as_ref(),
            models: &self.models,
            docs: &self.docs,
            platform: self.platform,
        };
        intel::rename(&mut self.registry, &ctx, uri, offset, new_name)
    }

    /// Colors the last completed validation found in the document.
    pub fn document_colors(&self, uri: &str) -> &[(TextRange, Rgba)] {
        self.colors.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Byte-range → line/col conversion for a document's current text.
    pub fn position_of(&mut self, uri: &str, offset: usize) -> Option<crate::Position> {
        let fs = self.fs.as_ref();
        self.docs.get_or_load(uri, fs).map(|doc| doc.position(offset))
    }
}
