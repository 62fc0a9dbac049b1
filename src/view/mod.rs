//! Console-side collection synchronization.
//!
//! Every screen follows the same loop: load the whole collection, let the user
//! edit one draft, send it, and reload everything once the write has landed.
//! There is no local patching; the facade is the only source of the list.
//!
//! Loads are tagged with a [`RequestToken`]. Only the newest token may commit,
//! so a driver that runs fetches elsewhere can hand results back in any order
//! without an older response overwriting a newer one.

pub mod screens;

use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

use crate::config::RetryPolicy;
use crate::error::{FacadeError, Recovery, ValidationError};
use crate::facade::Facade;
use crate::model::{Entity, Id, Validate};

pub use screens::{
    ClasesView, CursosView, EnrollmentOptions, EstudiantesView, MatriculasView, PagosView,
    PaymentOptions, Related, SessionOptions, TutoresView,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

/// Issues strictly increasing tokens and remembers the newest one.
#[derive(Debug, Default)]
pub(crate) struct Tokens {
    issued: u64,
}

impl Tokens {
    pub(crate) fn issue(&mut self) -> RequestToken {
        self.issued += 1;
        RequestToken(self.issued)
    }

    pub(crate) fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.issued
    }
}

/// Error shown above a screen until the next successful load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Banner {
    pub code: &'static str,
    pub message: String,
    pub recovery: Recovery,
}

impl From<&FacadeError> for Banner {
    fn from(e: &FacadeError) -> Self {
        Banner {
            code: e.code(),
            message: e.to_string(),
            recovery: e.recovery(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("no form is open")]
    NoDraft,
    #[error("a write is already in flight")]
    Busy,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Facade(#[from] FacadeError),
}

/// Repeat a read while it fails transiently, up to the policy's attempts.
pub(crate) fn with_retry<T>(
    policy: RetryPolicy,
    mut call: impl FnMut() -> Result<T, FacadeError>,
) -> Result<T, FacadeError> {
    let mut attempt = 1;
    loop {
        match call() {
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(attempt, error = %e, "transient read failure, retrying");
                if !policy.backoff.is_zero() {
                    std::thread::sleep(policy.backoff);
                }
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Submitting,
}

/// The form a screen has open: editable fields plus the id they belong to
/// (`None` while creating).
#[derive(Debug, Clone, PartialEq)]
pub struct Draft<I> {
    pub id: Option<Id>,
    pub input: I,
    pub error: Option<String>,
}

/// A validated draft on its way to the facade.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite<I> {
    pub id: Option<Id>,
    pub input: I,
}

/// Proof that the user was asked before a delete. Only
/// [`CollectionView::request_delete`] can make one.
pub struct DeleteConfirmation<E> {
    id: Id,
    _entity: PhantomData<E>,
}

impl<E: Entity> DeleteConfirmation<E> {
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn prompt(&self) -> String {
        format!("Delete {} {}?", E::SINGULAR, self.id)
    }
}

impl<E: Entity> fmt::Debug for DeleteConfirmation<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeleteConfirmation")
            .field("entity", &E::SINGULAR)
            .field("id", &self.id)
            .finish()
    }
}

/// One screen's copy of a collection, plus whatever related collections its
/// form needs for selects (`R`).
pub struct CollectionView<E: Entity, R = ()> {
    phase: Phase,
    items: Vec<E>,
    related: R,
    loaded_once: bool,
    stale: bool,
    draft: Option<Draft<E::Input>>,
    banner: Option<Banner>,
    tokens: Tokens,
    retry: RetryPolicy,
}

impl<E: Entity, R: Default> CollectionView<E, R> {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            items: Vec::new(),
            related: R::default(),
            loaded_once: false,
            stale: false,
            draft: None,
            banner: None,
            tokens: Tokens::default(),
            retry,
        }
    }
}

impl<E: Entity, R: Default> Default for CollectionView<E, R> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl<E: Entity, R> CollectionView<E, R> {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Records in facade order.
    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn related(&self) -> &R {
        &self.related
    }

    /// True when the last load failed and `items` is from an earlier one.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn draft(&self) -> Option<&Draft<E::Input>> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut E::Input> {
        self.draft.as_mut().map(|d| &mut d.input)
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    fn settled_phase(&self) -> Phase {
        if self.loaded_once {
            Phase::Loaded
        } else {
            Phase::Idle
        }
    }

    pub fn begin_load(&mut self) -> RequestToken {
        if self.phase != Phase::Submitting {
            self.phase = Phase::Loading;
        }
        self.tokens.issue()
    }

    /// Apply a fetch result. Returns false when `token` has been superseded,
    /// in which case nothing changes.
    pub fn finish_load(
        &mut self,
        token: RequestToken,
        result: Result<(Vec<E>, R), FacadeError>,
    ) -> bool {
        if !self.tokens.is_latest(token) {
            tracing::debug!(entity = E::PLURAL, ?token, "discarding superseded load");
            return false;
        }
        match result {
            Ok((items, related)) => {
                self.items = items;
                self.related = related;
                self.loaded_once = true;
                self.stale = false;
                self.banner = None;
            }
            Err(e) => {
                tracing::warn!(entity = E::PLURAL, error = %e, "load failed");
                self.stale = self.loaded_once;
                self.banner = Some(Banner::from(&e));
            }
        }
        if self.phase != Phase::Submitting {
            self.phase = self.settled_phase();
        }
        true
    }

    /// Fetch the collection and its related collections, all or nothing.
    pub fn load<F>(&mut self, facade: &F) -> Result<(), Banner>
    where
        F: Facade<E>,
        R: Related<F>,
    {
        let token = self.begin_load();
        let result = with_retry(self.retry, || {
            let items = Facade::<E>::get_all(facade)?;
            let related = R::fetch(facade)?;
            Ok((items, related))
        });
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(e) => Err(Banner::from(e)),
        };
        self.finish_load(token, result);
        outcome
    }

    pub fn open_create(&mut self) -> Result<(), ViewError> {
        if self.phase == Phase::Submitting {
            return Err(ViewError::Busy);
        }
        self.draft = Some(Draft {
            id: None,
            input: E::Input::default(),
            error: None,
        });
        Ok(())
    }

    /// Start editing `entity`. Only its editable fields are copied.
    pub fn open_edit(&mut self, entity: &E) -> Result<(), ViewError> {
        if self.phase == Phase::Submitting {
            return Err(ViewError::Busy);
        }
        self.draft = Some(Draft {
            id: Some(entity.id()),
            input: entity.editable(),
            error: None,
        });
        Ok(())
    }

    pub fn cancel_draft(&mut self) {
        self.draft = None;
    }

    /// Validate the draft and hand back the write to send. The view stays in
    /// [`Phase::Submitting`] until [`Self::finish_submit`] is called.
    ///
    /// A draft that fails its form rules is never sent: the form stays open
    /// with the message and nothing is returned.
    pub fn begin_submit(&mut self) -> Result<PendingWrite<E::Input>, ViewError> {
        if self.phase == Phase::Submitting {
            return Err(ViewError::Busy);
        }
        let Some(draft) = self.draft.as_mut() else {
            return Err(ViewError::NoDraft);
        };
        draft.input.normalize();
        if let Err(v) = draft.input.form() {
            draft.error = Some(v.to_string());
            return Err(ViewError::Invalid(v));
        }
        draft.error = None;
        let pending = PendingWrite {
            id: draft.id,
            input: draft.input.clone(),
        };
        self.phase = Phase::Submitting;
        Ok(pending)
    }

    /// Apply the outcome of a write started by [`Self::begin_submit`].
    ///
    /// Success closes the draft and reloads. A facade error keeps the draft
    /// open with the message, except when the record is gone, in which case
    /// the draft is dropped and the list reloaded.
    pub fn finish_submit<F>(
        &mut self,
        facade: &F,
        result: Result<E, FacadeError>,
    ) -> Result<E, ViewError>
    where
        F: Facade<E>,
        R: Related<F>,
    {
        self.phase = self.settled_phase();
        match result {
            Ok(saved) => {
                self.draft = None;
                let _ = self.load(facade);
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(entity = E::SINGULAR, error = %e, "submit rejected");
                if e.recovery() == Recovery::Reload {
                    self.draft = None;
                    // A failed reload has already set its own banner.
                    if self.load(facade).is_ok() {
                        self.banner = Some(Banner::from(&e));
                    }
                } else if let Some(d) = self.draft.as_mut() {
                    d.error = Some(e.to_string());
                }
                Err(ViewError::Facade(e))
            }
        }
    }

    /// Validate the draft, send it, and reload once the write is confirmed.
    pub fn submit<F>(&mut self, facade: &F) -> Result<E, ViewError>
    where
        F: Facade<E>,
        R: Related<F>,
    {
        let pending = self.begin_submit()?;
        let result = match pending.id {
            Some(id) => Facade::<E>::update(facade, id, &pending.input),
            None => Facade::<E>::create(facade, &pending.input),
        };
        self.finish_submit(facade, result)
    }

    /// First half of a delete: produce the confirmation the user must accept.
    pub fn request_delete(&self, id: Id) -> Result<DeleteConfirmation<E>, ViewError> {
        if !self.items.iter().any(|e| e.id() == id) {
            return Err(FacadeError::not_found(E::SINGULAR, id).into());
        }
        Ok(DeleteConfirmation {
            id,
            _entity: PhantomData,
        })
    }

    /// Accept a confirmation and return the id to delete. The view stays in
    /// [`Phase::Submitting`] until [`Self::finish_delete`] is called.
    pub fn begin_delete(
        &mut self,
        confirmation: &DeleteConfirmation<E>,
    ) -> Result<Id, ViewError> {
        if self.phase == Phase::Submitting {
            return Err(ViewError::Busy);
        }
        self.phase = Phase::Submitting;
        Ok(confirmation.id)
    }

    pub fn finish_delete<F>(
        &mut self,
        facade: &F,
        id: Id,
        result: Result<(), FacadeError>,
    ) -> Result<(), ViewError>
    where
        F: Facade<E>,
        R: Related<F>,
    {
        self.phase = self.settled_phase();
        match result {
            Ok(()) => {
                if self.draft.as_ref().and_then(|d| d.id) == Some(id) {
                    self.draft = None;
                }
                let _ = self.load(facade);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entity = E::SINGULAR, id, error = %e, "delete rejected");
                let reload_failed = e.recovery() == Recovery::Reload && self.load(facade).is_err();
                if !reload_failed {
                    self.banner = Some(Banner::from(&e));
                }
                Err(ViewError::Facade(e))
            }
        }
    }

    pub fn confirm_delete<F>(
        &mut self,
        facade: &F,
        confirmation: DeleteConfirmation<E>,
    ) -> Result<(), ViewError>
    where
        F: Facade<E>,
        R: Related<F>,
    {
        let id = self.begin_delete(&confirmation)?;
        let result = Facade::<E>::delete(facade, id);
        self.finish_delete(facade, id, result)
    }
}
