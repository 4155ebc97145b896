use serde_json::Value;
use shared::models::{Profile, ProfileKind, ProfilePatch};

use super::{Outcome, ProfileError, validation};
use crate::{api::ProfileApi, error::ApiError};

/// Issued by [`ProfileReconciler::begin_load`]; hand it back with the fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    subject: i64,
    generation: u64,
}

impl LoadTicket {
    #[must_use]
    pub fn subject(&self) -> i64 {
        self.subject
    }
}

/// Issued by [`ProfileReconciler::begin_save`]; carries the body to send.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket {
    subject: i64,
    generation: u64,
    payload: Value,
}

impl SaveTicket {
    #[must_use]
    pub fn subject(&self) -> i64 {
        self.subject
    }

    /// Update body for the profile endpoint.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// State kept between the optimistic apply and the server's answer.
#[derive(Debug, Clone)]
struct PendingSave {
    generation: u64,
    before_base: Profile,
    before_snapshot: Profile,
}

/// Drives one profile view: load, edit, cancel and optimistic save.
///
/// The displayed profile is `base` with the pending edits laid over it.
/// `snapshot` is the last state confirmed by the server (or optimistically
/// applied by an in-flight save) and is what [`ProfileReconciler::cancel`]
/// returns to.
///
/// Every load bumps a generation counter. Tickets from an older generation
/// are discarded on return, so a slow response can never overwrite a view
/// that has since moved to another subject.
#[derive(Debug)]
pub struct ProfileReconciler<P> {
    api: P,
    kind: ProfileKind,
    viewer: Option<i64>,
    subject: Option<i64>,
    generation: u64,
    base: Option<Profile>,
    snapshot: Option<Profile>,
    pending: ProfilePatch,
    editing: bool,
    loading: bool,
    in_flight: Option<PendingSave>,
    error: Option<String>,
}

impl<P: ProfileApi> ProfileReconciler<P> {
    /// `viewer` is the signed-in user's id, if any.
    pub fn new(api: P, kind: ProfileKind, viewer: Option<i64>) -> Self {
        Self {
            api,
            kind,
            viewer,
            subject: None,
            generation: 0,
            base: None,
            snapshot: None,
            pending: ProfilePatch::new(),
            editing: false,
            loading: false,
            in_flight: None,
            error: None,
        }
    }

    /// Fetch and show the profile of `subject`, or the viewer's own.
    ///
    /// # Errors
    /// Fails when there is nobody to load or the fetch fails. The error is
    /// also recorded and the view is left empty.
    pub async fn load(&mut self, subject: Option<i64>) -> Result<Outcome, ProfileError> {
        let ticket = self.begin_load(subject)?;
        let result = self.api.fetch_profile(self.kind, ticket.subject).await;
        self.finish_load(ticket, result)
    }

    /// Reset the view for `subject` and invalidate anything still in flight.
    ///
    /// # Errors
    /// Returns [`ProfileError::MissingSubject`] when neither `subject` nor a
    /// viewer is known.
    pub fn begin_load(&mut self, subject: Option<i64>) -> Result<LoadTicket, ProfileError> {
        self.generation += 1;
        self.base = None;
        self.snapshot = None;
        self.pending.clear();
        self.editing = false;
        self.in_flight = None;
        self.error = None;

        let Some(subject) = subject.or(self.viewer) else {
            self.subject = None;
            self.loading = false;
            let error = ProfileError::MissingSubject;
            self.error = Some(error.to_string());
            return Err(error);
        };

        tracing::debug!(subject, kind = %self.kind, generation = self.generation, "loading profile");
        self.subject = Some(subject);
        self.loading = true;
        Ok(LoadTicket {
            subject,
            generation: self.generation,
        })
    }

    /// Apply a fetch result.
    ///
    /// # Errors
    /// Returns the fetch error after recording it.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Value, ApiError>,
    ) -> Result<Outcome, ProfileError> {
        if !self.is_current(ticket.subject, ticket.generation) {
            tracing::debug!(subject = ticket.subject, "discarding stale profile load");
            return Ok(Outcome::Discarded);
        }
        self.loading = false;

        match result {
            Ok(raw) => {
                let profile = Profile::from_wire(self.kind, ticket.subject, &raw);
                self.snapshot = Some(profile.clone());
                self.base = Some(profile);
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Lay `patch` over the pending edits and enter editing mode.
    ///
    /// # Errors
    /// Only the owner may edit a loaded profile, never during a save, and
    /// only with fields of this profile kind.
    pub fn edit(&mut self, patch: &ProfilePatch) -> Result<(), ProfileError> {
        if self.base.is_none() {
            return Err(ProfileError::NotLoaded);
        }
        if !self.is_owner() {
            return Err(ProfileError::NotOwner);
        }
        if self.in_flight.is_some() {
            return Err(ProfileError::SaveInFlight);
        }
        if let Some(field) = patch.first_foreign_field(self.kind) {
            return Err(shared::models::profile::FieldNotApplicable {
                field,
                kind: self.kind,
            }
            .into());
        }

        if patch.is_empty() {
            return Ok(());
        }
        self.pending.merge(patch);
        self.editing = true;
        Ok(())
    }

    /// Drop pending edits and return to the last known-good profile.
    ///
    /// # Errors
    /// Returns [`ProfileError::SaveInFlight`] while a save is unresolved.
    pub fn cancel(&mut self) -> Result<(), ProfileError> {
        if self.in_flight.is_some() {
            return Err(ProfileError::SaveInFlight);
        }
        self.pending.clear();
        self.base.clone_from(&self.snapshot);
        self.editing = false;
        self.error = None;
        Ok(())
    }

    /// Validate, apply optimistically, send, then confirm or roll back.
    ///
    /// # Errors
    /// Validation failures make no network call. API failures roll the view
    /// back to exactly what it showed before the save.
    pub async fn save(&mut self) -> Result<Outcome, ProfileError> {
        let ticket = self.begin_save()?;
        let result = self
            .api
            .update_profile(self.kind, ticket.subject, &ticket.payload)
            .await;
        self.complete_save(ticket, result)
    }

    /// Phase one: validate the merged view and apply it speculatively.
    ///
    /// # Errors
    /// Fails without touching the draft if the view is not loaded or not
    /// owned, a save is already pending, or validation rejects it.
    pub fn begin_save(&mut self) -> Result<SaveTicket, ProfileError> {
        if self.in_flight.is_some() {
            return Err(ProfileError::SaveInFlight);
        }
        let (Some(subject), Some(base), Some(snapshot)) =
            (self.subject, self.base.as_ref(), self.snapshot.as_ref())
        else {
            return Err(ProfileError::NotLoaded);
        };
        if !self.is_owner() {
            return Err(ProfileError::NotOwner);
        }

        let merged = base.merged(&self.pending)?;
        if let Err(message) = validation::validate(&merged) {
            self.error = Some(message.to_string());
            return Err(ProfileError::Validation(message));
        }

        self.in_flight = Some(PendingSave {
            generation: self.generation,
            before_base: base.clone(),
            before_snapshot: snapshot.clone(),
        });
        let payload = merged.to_payload();
        tracing::debug!(subject, fields = self.pending.len(), "saving profile");

        self.snapshot = Some(merged.clone());
        self.base = Some(merged);
        self.error = None;

        Ok(SaveTicket {
            subject,
            generation: self.generation,
            payload,
        })
    }

    /// Phase two: replace with the server's profile, or roll back.
    ///
    /// # Errors
    /// Returns the API error after restoring the pre-save view and recording
    /// the message.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Value, ApiError>,
    ) -> Result<Outcome, ProfileError> {
        let matches_flight = self
            .in_flight
            .as_ref()
            .is_some_and(|pending| pending.generation == ticket.generation);
        if !matches_flight || !self.is_current(ticket.subject, ticket.generation) {
            tracing::debug!(subject = ticket.subject, "discarding stale profile save");
            return Ok(Outcome::Discarded);
        }
        let Some(pending_save) = self.in_flight.take() else {
            return Ok(Outcome::Discarded);
        };

        match result {
            Ok(raw) => {
                let optimistic = self
                    .base
                    .take()
                    .unwrap_or_else(|| pending_save.before_base.clone());
                let confirmed = Profile::from_saved(&optimistic, &raw);
                self.snapshot = Some(confirmed.clone());
                self.base = Some(confirmed);
                self.pending.clear();
                self.editing = false;
                self.error = None;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                tracing::debug!(error = %err, "profile save failed, rolling back");
                self.rollback(pending_save);
                self.error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Restore the view captured before the optimistic apply. Pending edits
    /// are kept, so the displayed profile matches its pre-save value.
    fn rollback(&mut self, pending_save: PendingSave) {
        self.base = Some(pending_save.before_base);
        self.snapshot = Some(pending_save.before_snapshot);
    }

    fn is_current(&self, subject: i64, generation: u64) -> bool {
        self.generation == generation && self.subject == Some(subject)
    }

    /// What the view shows: `base` with pending edits applied.
    #[must_use]
    pub fn displayed(&self) -> Option<Profile> {
        let base = self.base.as_ref()?;
        // Edits are checked against the kind on entry, so the merge cannot fail.
        Some(base.merged(&self.pending).unwrap_or_else(|_| base.clone()))
    }

    #[must_use]
    pub fn base(&self) -> Option<&Profile> {
        self.base.as_ref()
    }

    /// Last profile confirmed by the server.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Profile> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn pending(&self) -> &ProfilePatch {
        &self.pending
    }

    #[must_use]
    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    #[must_use]
    pub fn subject(&self) -> Option<i64> {
        self.subject
    }

    #[must_use]
    pub fn viewer(&self) -> Option<i64> {
        self.viewer
    }

    /// True when the viewer is looking at their own profile.
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.viewer.is_some() && self.viewer == self.subject
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn api(&self) -> &P {
        &self.api
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{USER_NOT_FOUND, validation::INVALID_EMAIL};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::json;
    use shared::models::ProfileField;
    use std::{collections::VecDeque, sync::Mutex};

    #[derive(Default)]
    struct StubProfileApi {
        fetch: Mutex<VecDeque<Result<Value, ApiError>>>,
        update: Mutex<VecDeque<Result<Value, ApiError>>>,
        sent: Mutex<Vec<Value>>,
    }

    impl StubProfileApi {
        fn enqueue_fetch(&self, response: Result<Value, ApiError>) {
            self.fetch.lock().unwrap().push_back(response);
        }

        fn enqueue_update(&self, response: Result<Value, ApiError>) {
            self.update.lock().unwrap().push_back(response);
        }

        fn sent(&self) -> Vec<Value> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProfileApi for StubProfileApi {
        async fn fetch_profile(&self, _kind: ProfileKind, _user_id: i64) -> Result<Value, ApiError> {
            self.fetch
                .lock()
                .unwrap()
                .pop_front()
                .expect("missing fetch response")
        }

        async fn update_profile(
            &self,
            _kind: ProfileKind,
            _user_id: i64,
            payload: &Value,
        ) -> Result<Value, ApiError> {
            self.sent.lock().unwrap().push(payload.clone());
            self.update
                .lock()
                .unwrap()
                .pop_front()
                .expect("missing update response")
        }
    }

    fn server_error(message: &str) -> ApiError {
        ApiError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn alumni_record() -> Value {
        json!({
            "id": 3,
            "user_id": 7,
            "name": "Asha",
            "email": "asha@example.com",
            "linkedin": "https://linkedin.com/in/asha",
            "domain": "Data",
            "company": "Acme",
            "profile_pic": "asha.png"
        })
    }

    async fn loaded_owner() -> ProfileReconciler<StubProfileApi> {
        let api = StubProfileApi::default();
        api.enqueue_fetch(Ok(alumni_record()));
        let mut reconciler = ProfileReconciler::new(api, ProfileKind::Alumni, Some(7));
        assert_eq!(reconciler.load(None).await.unwrap(), Outcome::Applied);
        reconciler
    }

    fn patch(field: ProfileField, value: &str) -> ProfilePatch {
        ProfilePatch::new().with(field, value)
    }

    #[tokio::test]
    async fn load_normalizes_wire_variants() {
        let reconciler = loaded_owner().await;
        let shown = reconciler.displayed().unwrap();

        assert_eq!(reconciler.subject(), Some(7));
        assert_eq!(shown.linked_in, "https://linkedin.com/in/asha");
        assert_eq!(shown.get(ProfileField::WorkingDomain), Some("Data"));
        assert_eq!(shown.phone, "");
        assert!(!reconciler.is_editing());
        assert!(!reconciler.is_loading());
        assert!(reconciler.pending().is_empty());
    }

    #[tokio::test]
    async fn failed_load_leaves_empty_non_editable_view() {
        let api = StubProfileApi::default();
        api.enqueue_fetch(Err(server_error("Profile not found")));
        let mut reconciler = ProfileReconciler::new(api, ProfileKind::Student, Some(7));

        assert!(reconciler.load(Some(7)).await.is_err());
        assert_eq!(reconciler.error(), Some("Profile not found"));
        assert!(reconciler.displayed().is_none());
        assert!(matches!(
            reconciler.edit(&patch(ProfileField::Name, "A")),
            Err(ProfileError::NotLoaded)
        ));
    }

    #[tokio::test]
    async fn load_without_subject_reports_user_not_found() {
        let mut reconciler =
            ProfileReconciler::new(StubProfileApi::default(), ProfileKind::Alumni, None);
        let error = reconciler.load(None).await.unwrap_err();
        assert!(matches!(error, ProfileError::MissingSubject));
        assert_eq!(reconciler.error(), Some(USER_NOT_FOUND));
    }

    #[tokio::test]
    async fn edits_layer_with_last_write_winning() {
        let mut reconciler = loaded_owner().await;
        let base = reconciler.base().unwrap().clone();

        let edits = [
            patch(ProfileField::Name, "A"),
            patch(ProfileField::Company, "Initech").with(ProfileField::Name, "B"),
            patch(ProfileField::Bio, "hello"),
        ];
        let mut union = ProfilePatch::new();
        for edit in &edits {
            reconciler.edit(edit).unwrap();
            union.merge(edit);
        }

        assert!(reconciler.is_editing());
        let shown = reconciler.displayed().unwrap();
        assert_eq!(shown, base.merged(&union).unwrap());
        assert_eq!(shown.name, "B");
        assert_eq!(shown.get(ProfileField::Company), Some("Initech"));
    }

    #[tokio::test]
    async fn edit_rejects_fields_of_other_kind() {
        let mut reconciler = loaded_owner().await;
        let error = reconciler
            .edit(&patch(ProfileField::Cgpa, "9.0"))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "field `cgpa` does not exist on alumni profiles"
        );
        assert!(reconciler.pending().is_empty());
        assert!(!reconciler.is_editing());
    }

    #[tokio::test]
    async fn empty_patch_does_not_start_editing() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&ProfilePatch::new()).unwrap();

        assert!(!reconciler.is_editing());
        assert!(reconciler.pending().is_empty());
        assert_eq!(reconciler.displayed().as_ref(), reconciler.base());
    }

    #[tokio::test]
    async fn only_owner_may_edit() {
        let api = StubProfileApi::default();
        api.enqueue_fetch(Ok(alumni_record()));
        let mut reconciler = ProfileReconciler::new(api, ProfileKind::Alumni, Some(99));
        reconciler.load(Some(7)).await.unwrap();

        assert!(!reconciler.is_owner());
        assert!(matches!(
            reconciler.edit(&patch(ProfileField::Name, "A")),
            Err(ProfileError::NotOwner)
        ));
        assert!(matches!(reconciler.begin_save(), Err(ProfileError::NotOwner)));
    }

    #[tokio::test]
    async fn cancel_restores_last_known_good() {
        let mut reconciler = loaded_owner().await;
        let after_load = reconciler.displayed().unwrap();

        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        reconciler.edit(&patch(ProfileField::Phone, "123")).unwrap();
        reconciler.cancel().unwrap();

        assert_eq!(reconciler.displayed().unwrap(), after_load);
        assert!(!reconciler.is_editing());
        assert!(reconciler.pending().is_empty());
    }

    #[tokio::test]
    async fn cancel_after_save_restores_saved_profile() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        reconciler
            .api()
            .enqueue_update(Ok(json!({"name": "A", "email": "asha@example.com"})));
        reconciler.save().await.unwrap();
        let after_save = reconciler.displayed().unwrap();

        reconciler.edit(&patch(ProfileField::Name, "Z")).unwrap();
        reconciler.cancel().unwrap();
        assert_eq!(reconciler.displayed().unwrap(), after_save);
    }

    #[tokio::test]
    async fn invalid_email_blocks_save_without_network() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        reconciler.edit(&patch(ProfileField::Email, "bad")).unwrap();

        let error = reconciler.save().await.unwrap_err();
        assert!(matches!(error, ProfileError::Validation(INVALID_EMAIL)));
        assert_eq!(reconciler.error(), Some(INVALID_EMAIL));
        assert!(reconciler.api().sent().is_empty());
        assert!(!reconciler.is_saving());
        assert_eq!(reconciler.pending().get(ProfileField::Name), Some("A"));
        assert_eq!(reconciler.pending().get(ProfileField::Email), Some("bad"));
        assert_eq!(reconciler.pending().len(), 2);
        assert!(reconciler.is_editing());
    }

    #[tokio::test]
    async fn server_response_wins_after_save() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        reconciler
            .api()
            .enqueue_update(Ok(json!({"name": "B", "email": "asha@example.com"})));

        assert_eq!(reconciler.save().await.unwrap(), Outcome::Applied);

        let shown = reconciler.displayed().unwrap();
        assert_eq!(shown.name, "B");
        assert!(reconciler.pending().is_empty());
        assert!(!reconciler.is_editing());
        // Omitted server-managed values fall back to the optimistic view.
        assert_eq!(shown.id, Some(3));
        assert_eq!(shown.profile_pic, "asha.png");

        let sent = reconciler.api().sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["name"], "A");
        assert_eq!(sent[0]["workingDomain"], "Data");
        assert!(sent[0].get("id").is_none());
        assert!(sent[0].get("profile_pic").is_none());
    }

    #[tokio::test]
    async fn optimistic_view_is_shown_while_saving() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Bio, "new bio")).unwrap();

        let ticket = reconciler.begin_save().unwrap();
        assert!(reconciler.is_saving());
        assert_eq!(reconciler.base().unwrap().bio, "new bio");
        assert_eq!(ticket.payload()["bio"], "new bio");
        assert!(matches!(
            reconciler.begin_save(),
            Err(ProfileError::SaveInFlight)
        ));
        assert!(matches!(
            reconciler.edit(&patch(ProfileField::Bio, "x")),
            Err(ProfileError::SaveInFlight)
        ));

        reconciler
            .complete_save(ticket, Ok(json!({"bio": "new bio"})))
            .unwrap();
        assert!(!reconciler.is_saving());
    }

    #[tokio::test]
    async fn failed_save_rolls_back_to_pre_save_view() {
        let mut reconciler = loaded_owner().await;
        let loaded = reconciler.base().unwrap().clone();
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        let before = reconciler.displayed().unwrap();

        reconciler
            .api()
            .enqueue_update(Err(server_error("Database unavailable")));
        let error = reconciler.save().await.unwrap_err();

        assert_eq!(error.to_string(), "Database unavailable");
        assert_eq!(reconciler.error(), Some("Database unavailable"));
        assert_eq!(reconciler.displayed().unwrap(), before);
        assert_eq!(reconciler.base().unwrap(), &loaded);
        assert_eq!(reconciler.snapshot().unwrap(), &loaded);
        assert_eq!(reconciler.pending().get(ProfileField::Name), Some("A"));
        assert!(!reconciler.is_saving());

        // Cancel still returns to the last confirmed profile.
        reconciler.cancel().unwrap();
        assert_eq!(reconciler.displayed().unwrap(), loaded);
    }

    #[tokio::test]
    async fn rollback_is_idempotent() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        let before = reconciler.displayed().unwrap();

        let ticket = reconciler.begin_save().unwrap();
        let replay = ticket.clone();
        assert!(
            reconciler
                .complete_save(ticket, Err(server_error("nope")))
                .is_err()
        );
        let after_first = reconciler.displayed().unwrap();

        // A second resolution of the same save changes nothing.
        assert_eq!(
            reconciler
                .complete_save(replay, Err(server_error("nope")))
                .unwrap(),
            Outcome::Discarded
        );
        assert_eq!(reconciler.displayed().unwrap(), after_first);
        assert_eq!(after_first, before);
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let mut reconciler =
            ProfileReconciler::new(StubProfileApi::default(), ProfileKind::Alumni, Some(7));
        let first = reconciler.begin_load(Some(7)).unwrap();
        let second = reconciler.begin_load(Some(8)).unwrap();

        assert_eq!(
            reconciler.finish_load(first, Ok(alumni_record())).unwrap(),
            Outcome::Discarded
        );
        assert!(reconciler.displayed().is_none());

        reconciler
            .finish_load(second, Ok(json!({"name": "Ravi"})))
            .unwrap();
        let shown = reconciler.displayed().unwrap();
        assert_eq!(shown.name, "Ravi");
        assert_eq!(shown.user_id, 8);
    }

    #[tokio::test]
    async fn save_resolving_after_navigation_is_discarded() {
        let mut reconciler = loaded_owner().await;
        reconciler.edit(&patch(ProfileField::Name, "A")).unwrap();
        let ticket = reconciler.begin_save().unwrap();

        let load = reconciler.begin_load(Some(8)).unwrap();
        reconciler
            .finish_load(load, Ok(json!({"name": "Ravi"})))
            .unwrap();

        assert_eq!(
            reconciler
                .complete_save(ticket, Ok(json!({"name": "A"})))
                .unwrap(),
            Outcome::Discarded
        );
        assert_eq!(reconciler.displayed().unwrap().name, "Ravi");
        assert!(!reconciler.is_saving());
    }
}
