//! Wizard state machine.
//!
//! [`Wizard`] owns the session state, the current step and the renderer. Every network
//! operation is split in two halves so the front-end decides where the request actually runs:
//!
//! - `begin_*` validates, updates the screen (busy indicator, optimistic step change) and hands
//!   back a ticket;
//! - `finish_*` takes the ticket plus the request outcome and applies it.
//!
//! Tickets carry a per-operation sequence number. A completion whose ticket is no longer the
//! latest of its kind is reported as [`Completion::Stale`] and changes nothing, so a slow
//! response can never overwrite the result of a newer request.

pub mod orchestrator;
mod step;

pub use orchestrator::Orchestrator;
pub use step::Step;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::WizardResult;
use crate::models::requests::{ConnectForm, ConnectionParams};
use crate::models::responses::AnalyticsRow;
use crate::models::session::SessionState;
use crate::render::{AnalyticsReport, Renderer, StatusKind};
use crate::utils::logging::describe_connection_target;

pub const CONNECTING_MESSAGE: &str = "Connecting to database...";
pub const CONNECTED_MESSAGE: &str = "\u{2713} Connected successfully!";
pub const NO_TABLES_MESSAGE: &str = "No tables found in the database";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Connect,
    ListCollections,
    FetchAnalytics,
}

/// Result of applying a response to the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    Applied(T),
    /// A newer request of the same kind was issued (or the page was left); nothing changed.
    Stale,
}

impl<T> Completion<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Completion::Stale)
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Completion::Applied(v) => Some(v),
            Completion::Stale => None,
        }
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTicket {
    seq: u64,
    correlation_id: String,
    params: ConnectionParams,
}

impl ConnectTicket {
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionsTicket {
    seq: u64,
    correlation_id: String,
}

impl CollectionsTicket {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsTicket {
    seq: u64,
    correlation_id: String,
    collection: String,
}

impl AnalyticsTicket {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

#[derive(Debug, Default)]
struct Sequencer {
    connect: u64,
    collections: u64,
    analytics: u64,
}

impl Sequencer {
    fn slot(&mut self, kind: RequestKind) -> &mut u64 {
        match kind {
            RequestKind::Connect => &mut self.connect,
            RequestKind::ListCollections => &mut self.collections,
            RequestKind::FetchAnalytics => &mut self.analytics,
        }
    }

    fn issue(&mut self, kind: RequestKind) -> u64 {
        let slot = self.slot(kind);
        *slot += 1;
        *slot
    }

    /// Invalidate whatever ticket of `kind` is outstanding.
    fn retire(&mut self, kind: RequestKind) {
        *self.slot(kind) += 1;
    }

    fn is_latest(&self, kind: RequestKind, seq: u64) -> bool {
        let latest = match kind {
            RequestKind::Connect => self.connect,
            RequestKind::ListCollections => self.collections,
            RequestKind::FetchAnalytics => self.analytics,
        };
        latest == seq
    }
}

/// User actions, as dispatched by a front-end.
#[derive(Debug, Clone)]
pub enum WizardEvent {
    Connect(ConnectForm),
    SelectCollection(usize),
    Back,
    NewAnalysis,
}

/// Work the front-end must run after handling an event.
#[derive(Debug)]
pub enum Dispatch {
    Connect(ConnectTicket),
    FetchAnalytics(AnalyticsTicket),
}

pub struct Wizard<R> {
    session: SessionState,
    step: Step,
    busy: bool,
    collections: Vec<String>,
    sequencer: Sequencer,
    renderer: R,
}

impl<R: Renderer> Wizard<R> {
    pub fn new(mut renderer: R) -> Self {
        renderer.show_step(Step::Connect);
        Self {
            session: SessionState::new(),
            step: Step::Connect,
            busy: false,
            collections: Vec::new(),
            sequencer: Sequencer::default(),
            renderer,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Names currently offered by the picker.
    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// True while no connect newer than `seq` has been issued.
    pub fn is_current_connect(&self, seq: u64) -> bool {
        self.sequencer.is_latest(RequestKind::Connect, seq)
    }

    pub fn handle(&mut self, event: WizardEvent) -> Option<Dispatch> {
        match event {
            WizardEvent::Connect(form) => {
                if self.busy {
                    debug!("[PHASE: connect] [STEP: ignored] connect already in flight");
                    return None;
                }
                self.begin_connect(&form).ok().map(Dispatch::Connect)
            }
            WizardEvent::SelectCollection(index) => {
                self.select_collection(index).map(Dispatch::FetchAnalytics)
            }
            WizardEvent::Back | WizardEvent::NewAnalysis => {
                self.go_to_step(Step::Connect);
                None
            }
        }
    }

    /// Show `step`. No prerequisite checks are made.
    ///
    /// Any step clears the connection status. Leaving the analytics page clears the selected
    /// collection and retires an in-flight analytics request; entering the connect page also
    /// clears every picker mark.
    pub fn go_to_step(&mut self, step: Step) {
        info!(
            "[PHASE: wizard] [STEP: navigate] step {} -> {}",
            self.step.number(),
            step.number()
        );
        self.step = step;
        self.renderer.show_step(step);
        self.renderer.clear_status();

        if step != Step::ViewAnalytics {
            self.session.clear_selection();
            self.sequencer.retire(RequestKind::FetchAnalytics);
        }
        if step == Step::Connect {
            self.renderer.mark_selected(None);
        }
    }

    pub fn begin_connect(&mut self, form: &ConnectForm) -> WizardResult<ConnectTicket> {
        let params = match form.validate() {
            Ok(p) => p,
            Err(e) => {
                warn!("[PHASE: connect] [STEP: validate] {}", e);
                self.renderer.render_status(&e.to_string(), StatusKind::Error);
                return Err(e);
            }
        };

        // A listing started for an earlier connect must not land after this one.
        self.sequencer.retire(RequestKind::ListCollections);
        let ticket = ConnectTicket {
            seq: self.sequencer.issue(RequestKind::Connect),
            correlation_id: new_correlation_id(),
            params,
        };
        info!(
            "[PHASE: connect] [STEP: begin] correlation_id={} target={}",
            ticket.correlation_id,
            describe_connection_target(&ticket.params.details())
        );

        self.busy = true;
        self.renderer.set_busy(true);
        self.renderer
            .render_status(CONNECTING_MESSAGE, StatusKind::Loading);
        Ok(ticket)
    }

    /// Apply a connect outcome. `Ok(message)` carries the backend's (possibly empty) message.
    pub fn finish_connect(
        &mut self,
        ticket: ConnectTicket,
        result: WizardResult<String>,
    ) -> WizardResult<Completion<()>> {
        if !self.sequencer.is_latest(RequestKind::Connect, ticket.seq) {
            debug!(
                "[PHASE: connect] [STEP: stale] correlation_id={} discarded",
                ticket.correlation_id
            );
            return Ok(Completion::Stale);
        }

        self.busy = false;
        self.renderer.set_busy(false);

        match result {
            Ok(message) => {
                let details = ticket.params.details();
                info!(
                    "[PHASE: connect] [STEP: success] correlation_id={} target={} backend_message={:?}",
                    ticket.correlation_id,
                    describe_connection_target(&details),
                    message
                );
                self.session.mark_connected(details);
                self.renderer
                    .render_status(CONNECTED_MESSAGE, StatusKind::Success);
                Ok(Completion::Applied(()))
            }
            Err(e) => {
                warn!(
                    "[PHASE: connect] [STEP: failed] correlation_id={} kind={:?} error={}",
                    ticket.correlation_id,
                    e.kind(),
                    e
                );
                self.renderer
                    .render_status(&format!("\u{2717} {}", e), StatusKind::Error);
                Err(e)
            }
        }
    }

    pub fn begin_list_collections(&mut self) -> CollectionsTicket {
        let ticket = CollectionsTicket {
            seq: self.sequencer.issue(RequestKind::ListCollections),
            correlation_id: new_correlation_id(),
        };
        info!(
            "[PHASE: collections] [STEP: begin] correlation_id={}",
            ticket.correlation_id
        );
        ticket
    }

    /// Apply a table listing. An empty list is not an error but keeps the wizard on the
    /// connect page with an error-styled status.
    pub fn finish_list_collections(
        &mut self,
        ticket: CollectionsTicket,
        result: WizardResult<Vec<String>>,
    ) -> WizardResult<Completion<Vec<String>>> {
        if !self
            .sequencer
            .is_latest(RequestKind::ListCollections, ticket.seq)
        {
            debug!(
                "[PHASE: collections] [STEP: stale] correlation_id={} discarded",
                ticket.correlation_id
            );
            return Ok(Completion::Stale);
        }

        match result {
            Ok(names) if names.is_empty() => {
                warn!(
                    "[PHASE: collections] [STEP: empty] correlation_id={}",
                    ticket.correlation_id
                );
                self.renderer
                    .render_status(NO_TABLES_MESSAGE, StatusKind::Error);
                Ok(Completion::Applied(names))
            }
            Ok(names) => {
                info!(
                    "[PHASE: collections] [STEP: loaded] correlation_id={} count={}",
                    ticket.correlation_id,
                    names.len()
                );
                self.collections = names.clone();
                self.renderer.render_collection_picker(&names);
                self.go_to_step(Step::SelectCollection);
                Ok(Completion::Applied(names))
            }
            Err(e) => {
                warn!(
                    "[PHASE: collections] [STEP: failed] correlation_id={} kind={:?} error={}",
                    ticket.correlation_id,
                    e.kind(),
                    e
                );
                self.renderer.render_status(
                    &format!("Error loading tables: {}", e),
                    StatusKind::Error,
                );
                Err(e)
            }
        }
    }

    /// Picker selection by position. `None` when `index` is out of range.
    pub fn select_collection(&mut self, index: usize) -> Option<AnalyticsTicket> {
        let name = self.collections.get(index)?.clone();
        Some(self.start_analytics(name, Some(index)))
    }

    /// Start an analysis for `collection`. The picker entry with that name, if any, is marked.
    pub fn begin_fetch_analytics(&mut self, collection: &str) -> AnalyticsTicket {
        let index = self.collections.iter().position(|c| c == collection);
        self.start_analytics(collection.to_string(), index)
    }

    fn start_analytics(&mut self, collection: String, index: Option<usize>) -> AnalyticsTicket {
        self.renderer.mark_selected(index);
        let ticket = AnalyticsTicket {
            seq: self.sequencer.issue(RequestKind::FetchAnalytics),
            correlation_id: new_correlation_id(),
            collection,
        };
        info!(
            "[PHASE: analytics] [STEP: begin] correlation_id={} table={}",
            ticket.correlation_id, ticket.collection
        );

        self.go_to_step(Step::ViewAnalytics);
        self.renderer.render_analytics_loading(&ticket.collection);
        ticket
    }

    /// Apply an analytics outcome. Returns the number of rows rendered.
    pub fn finish_fetch_analytics(
        &mut self,
        ticket: AnalyticsTicket,
        result: WizardResult<Vec<AnalyticsRow>>,
    ) -> WizardResult<Completion<usize>> {
        if !self
            .sequencer
            .is_latest(RequestKind::FetchAnalytics, ticket.seq)
        {
            debug!(
                "[PHASE: analytics] [STEP: stale] correlation_id={} table={} discarded",
                ticket.correlation_id, ticket.collection
            );
            return Ok(Completion::Stale);
        }

        match result {
            Ok(rows) => {
                let count = rows.len();
                info!(
                    "[PHASE: analytics] [STEP: loaded] correlation_id={} table={} rows={}",
                    ticket.correlation_id, ticket.collection, count
                );
                self.session.select_collection(ticket.collection.clone());
                let report = AnalyticsReport::new(ticket.collection, rows);
                self.renderer.render_results(&report);
                Ok(Completion::Applied(count))
            }
            Err(e) => {
                warn!(
                    "[PHASE: analytics] [STEP: failed] correlation_id={} table={} kind={:?} error={}",
                    ticket.correlation_id,
                    ticket.collection,
                    e.kind(),
                    e
                );
                self.renderer.render_analytics_error(&e.to_string());
                Err(e)
            }
        }
    }
}
