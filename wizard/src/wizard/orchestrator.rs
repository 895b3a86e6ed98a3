//! Sequential driver that pairs a [`Wizard`] with a [`BackendClient`].
//!
//! Each call runs its request to completion before returning, so at most one request per kind
//! is ever outstanding here. Front-ends that keep the UI responsive while requests run (the
//! terminal UI) drive the wizard's `begin_*`/`finish_*` halves directly instead.

use log::warn;
use std::time::Duration;

use super::{Completion, Step, Wizard};
use crate::api::{BackendClient, HttpTransport};
use crate::error::WizardResult;
use crate::models::requests::ConnectForm;
use crate::render::Renderer;

/// Pause between a successful connect and the table listing.
pub const DEFAULT_COLLECTIONS_DELAY: Duration = Duration::from_millis(500);

pub struct Orchestrator<T, R> {
    wizard: Wizard<R>,
    client: BackendClient<T>,
    collections_delay: Duration,
}

impl<T: HttpTransport, R: Renderer> Orchestrator<T, R> {
    pub fn new(client: BackendClient<T>, renderer: R) -> Self {
        Self {
            wizard: Wizard::new(renderer),
            client,
            collections_delay: DEFAULT_COLLECTIONS_DELAY,
        }
    }

    pub fn with_collections_delay(mut self, delay: Duration) -> Self {
        self.collections_delay = delay;
        self
    }

    pub fn wizard(&self) -> &Wizard<R> {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut Wizard<R> {
        &mut self.wizard
    }

    pub fn client(&self) -> &BackendClient<T> {
        &self.client
    }

    pub fn into_renderer(self) -> R {
        self.wizard.into_renderer()
    }

    /// Validate, connect and, on success, list tables after the configured delay.
    ///
    /// The returned error is the connect outcome only. A failed listing is already shown on the
    /// connect page and does not fail the connect.
    pub async fn connect(&mut self, form: &ConnectForm) -> WizardResult<()> {
        let ticket = self.wizard.begin_connect(form)?;
        let result = self.client.connect(ticket.params()).await;
        if self.wizard.finish_connect(ticket, result)?.is_stale() {
            return Ok(());
        }

        tokio::time::sleep(self.collections_delay).await;
        if let Err(e) = self.list_collections().await {
            warn!(
                "[PHASE: collections] [STEP: after-connect] listing failed: {}",
                e
            );
        }
        Ok(())
    }

    pub async fn list_collections(&mut self) -> WizardResult<Completion<Vec<String>>> {
        let ticket = self.wizard.begin_list_collections();
        let result = self.client.list_tables().await;
        self.wizard.finish_list_collections(ticket, result)
    }

    /// Select the picker entry at `index` and load its analytics. `None` if out of range.
    pub async fn select_collection(
        &mut self,
        index: usize,
    ) -> Option<WizardResult<Completion<usize>>> {
        let ticket = self.wizard.select_collection(index)?;
        let result = self.client.analytics(ticket.collection()).await;
        Some(self.wizard.finish_fetch_analytics(ticket, result))
    }

    pub async fn fetch_analytics(&mut self, collection: &str) -> WizardResult<Completion<usize>> {
        let ticket = self.wizard.begin_fetch_analytics(collection);
        let result = self.client.analytics(ticket.collection()).await;
        self.wizard.finish_fetch_analytics(ticket, result)
    }

    pub fn go_to_step(&mut self, step: Step) {
        self.wizard.go_to_step(step);
    }
}
