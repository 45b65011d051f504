//! Region → area → waste types selection flow.
//!
//! The engine is driven by the host: [`WizardEngine::present`] fetches the
//! options of the current step, [`WizardEngine::submit`] stores a choice and
//! presents whatever step comes next. Catalog and validation failures come
//! back as field errors on the re-presented step; only a duplicate
//! jurisdiction ends the session early.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{CanonicalJurisdiction, JurisdictionSelection, StreamKey, UniqueId};
use crate::normalize::{normalize, normalize_opt};
use crate::ports::{CatalogPort, PortError};
use crate::resolver;

/// Name shown in form titles.
pub const DEFAULT_NAME: &str = "Open ERZ";

/// Field key for errors not tied to a single input.
pub const BASE_FIELD: &str = "base";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Steps of a wizard session.
pub enum Step {
    /// Pick a region.
    Region,
    /// Pick a sub-area of the region.
    Area,
    /// Pick the waste streams to track.
    Types,
    /// Selection finalized.
    Done,
    /// Session ended because the jurisdiction is already configured.
    Aborted,
}

impl Step {
    /// The step following `self` on the regular path, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Step::Region => Some(Step::Area),
            Step::Area => Some(Step::Types),
            Step::Types => Some(Step::Done),
            Step::Done | Step::Aborted => None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// Validation and catalog errors raised while running the wizard.
pub enum WizardError {
    /// Fetching the step's options failed; presenting the step again retries.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[from] PortError),
    /// Another configuration entry already uses this jurisdiction.
    #[error("Jurisdiction {0} is already configured")]
    DuplicateJurisdiction(UniqueId),
    /// No waste type was chosen.
    #[error("Select at least one waste type")]
    EmptySelection,
    /// The submitted value was not offered on this step.
    #[error("{0:?} is not one of the offered options")]
    InvalidOption(String),
    /// Input was submitted for a step other than the current one.
    #[error("Expected input for {expected:?}, got {got:?}")]
    WrongStep {
        /// Step the wizard is on.
        expected: Step,
        /// Step the input was meant for.
        got: Step,
    },
}

impl WizardError {
    /// Error code reported to the presentation layer.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            WizardError::CatalogUnavailable(_) => "unknown",
            WizardError::DuplicateJurisdiction(_) => "already_configured",
            WizardError::EmptySelection => "empty_selection",
            WizardError::InvalidOption(_) => "invalid_option",
            WizardError::WrongStep { .. } => "wrong_step",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One selectable entry of a step.
pub struct SelectOption {
    /// Normalized label.
    pub label: String,
    /// Raw catalog token.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Everything the host needs to render a step.
pub struct StepForm {
    /// Step being presented.
    pub step: Step,
    /// Options sorted by label.
    pub options: Vec<SelectOption>,
    /// Whether several options may be chosen.
    pub multiple: bool,
    /// Error codes keyed by field.
    pub errors: BTreeMap<&'static str, &'static str>,
    /// Values for the form title.
    pub placeholders: BTreeMap<&'static str, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a completed session.
pub struct WizardResult {
    /// Finalized selection.
    pub selection: JurisdictionSelection,
    /// Canonical identity of the selection.
    pub canonical: CanonicalJurisdiction,
}

#[derive(Debug)]
/// What the host should do after presenting or submitting a step.
pub enum StepOutcome {
    /// Render this form and wait for input.
    Form(StepForm),
    /// The session cannot continue.
    Abort(WizardError),
    /// The selection is complete.
    Done(WizardResult),
}

#[derive(Debug, Clone)]
/// A user's answer to a step.
pub enum StepInput {
    /// Chosen region token.
    Region(String),
    /// Chosen area token.
    Area(String),
    /// Chosen waste stream tokens.
    Types(Vec<String>),
}

impl StepInput {
    fn step(&self) -> Step {
        match self {
            StepInput::Region(_) => Step::Region,
            StepInput::Area(_) => Step::Area,
            StepInput::Types(_) => Step::Types,
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    Region,
    Area {
        region: String,
    },
    Types {
        region: String,
        area: Option<String>,
        canonical: Option<CanonicalJurisdiction>,
    },
    Done(WizardResult),
    Aborted(UniqueId),
}

impl State {
    fn step(&self) -> Step {
        match self {
            State::Region => Step::Region,
            State::Area { .. } => Step::Area,
            State::Types { .. } => Step::Types,
            State::Done(_) => Step::Done,
            State::Aborted(_) => Step::Aborted,
        }
    }
}

type Errors = BTreeMap<&'static str, &'static str>;

/// Sequencer for one wizard session.
pub struct WizardEngine {
    catalog: Arc<dyn CatalogPort>,
    configured: BTreeSet<UniqueId>,
    state: State,
    offered: Vec<String>,
}

impl WizardEngine {
    /// Start a session. `configured` holds the ids of existing entries.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogPort>, configured: impl IntoIterator<Item = UniqueId>) -> Self {
        Self {
            catalog,
            configured: configured.into_iter().collect(),
            state: State::Region,
            offered: Vec::new(),
        }
    }

    /// Step the session is on.
    #[must_use]
    pub fn step(&self) -> Step {
        self.state.step()
    }

    /// Fetch and present the current step. Calling again retries the fetch.
    pub async fn present(&mut self) -> StepOutcome {
        self.present_with(Errors::new()).await
    }

    /// Submit the answer to the current step.
    pub async fn submit(&mut self, input: StepInput) -> StepOutcome {
        let current = self.step();
        if input.step() != current {
            let error = WizardError::WrongStep {
                expected: current,
                got: input.step(),
            };
            return self.reject(&error).await;
        }

        match &input {
            StepInput::Region(value) | StepInput::Area(value) => {
                if let Err(error) = self.check_offered(value) {
                    return self.reject(&error).await;
                }
            }
            StepInput::Types(types) => {
                if types.is_empty() {
                    return self.reject(&WizardError::EmptySelection).await;
                }
                if let Some(unknown) = types.iter().find(|value| !self.offered.contains(value)) {
                    let error = WizardError::InvalidOption(unknown.clone());
                    return self.reject(&error).await;
                }
            }
        }

        self.advance(Some(input));
        self.present().await
    }

    fn check_offered(&self, value: &str) -> Result<(), WizardError> {
        if self.offered.iter().any(|offered| offered == value) {
            Ok(())
        } else {
            Err(WizardError::InvalidOption(value.to_owned()))
        }
    }

    async fn reject(&mut self, error: &WizardError) -> StepOutcome {
        debug!(step = ?self.step(), code = error.code(), "step input rejected");
        self.present_with(Errors::from([(BASE_FIELD, error.code())]))
            .await
    }

    /// Move to the step following the current one. `None` answers the area
    /// step of a region without areas.
    fn advance(&mut self, answer: Option<StepInput>) {
        let Some(target) = self.step().next() else {
            return;
        };
        let previous = std::mem::replace(&mut self.state, State::Region);
        self.state = match (previous, target, answer) {
            (State::Region, Step::Area, Some(StepInput::Region(region))) => {
                debug!(%region, "region selected");
                State::Area { region }
            }
            (State::Area { region }, Step::Types, Some(StepInput::Area(area))) => {
                debug!(%region, %area, "area selected");
                State::Types {
                    region,
                    area: Some(area),
                    canonical: None,
                }
            }
            (State::Area { region }, Step::Types, None) => State::Types {
                region,
                area: None,
                canonical: None,
            },
            (
                State::Types {
                    region,
                    area,
                    canonical,
                },
                Step::Done,
                Some(StepInput::Types(types)),
            ) => State::Done(finish(region, area, canonical, types)),
            (unchanged, _, _) => unchanged,
        };
    }

    async fn present_with(&mut self, errors: Errors) -> StepOutcome {
        loop {
            match &mut self.state {
                State::Region => {
                    let fetched = self.catalog.regions().await;
                    let placeholders = BTreeMap::from([("name", DEFAULT_NAME.to_owned())]);
                    return self.form(Step::Region, fetched, errors, placeholders);
                }
                State::Area { region } => {
                    let region = region.clone();
                    match self.catalog.areas(&region).await {
                        Ok(areas) if areas.is_empty() => {
                            debug!(%region, "region has no areas, skipping area step");
                            self.advance(None);
                        }
                        fetched => {
                            let placeholders = BTreeMap::from([
                                ("name", DEFAULT_NAME.to_owned()),
                                ("region", normalize(&region)),
                            ]);
                            return self.form(Step::Area, fetched, errors, placeholders);
                        }
                    }
                }
                State::Types {
                    region,
                    area,
                    canonical,
                } => {
                    if canonical.is_none() {
                        let derived = resolver::canonical(region, area.as_deref());
                        if self.configured.contains(&derived.unique_id) {
                            debug!(unique_id = %derived.unique_id, "jurisdiction already configured");
                            let unique_id = derived.unique_id;
                            self.state = State::Aborted(unique_id.clone());
                            return StepOutcome::Abort(WizardError::DuplicateJurisdiction(unique_id));
                        }
                        *canonical = Some(derived);
                    }

                    let mut placeholders = BTreeMap::from([
                        ("name", DEFAULT_NAME.to_owned()),
                        ("region", normalize(region)),
                    ]);
                    if let Some(area) = normalize_opt(area.as_deref()) {
                        placeholders.insert("area", area);
                    }
                    let region = region.clone();
                    let fetched = self.catalog.waste_types(&region).await;
                    return self.form(Step::Types, fetched, errors, placeholders);
                }
                State::Done(result) => return StepOutcome::Done(result.clone()),
                State::Aborted(unique_id) => {
                    return StepOutcome::Abort(WizardError::DuplicateJurisdiction(
                        unique_id.clone(),
                    ));
                }
            }
        }
    }

    fn form(
        &mut self,
        step: Step,
        fetched: Result<Vec<String>, PortError>,
        mut errors: Errors,
        placeholders: BTreeMap<&'static str, String>,
    ) -> StepOutcome {
        let values = match fetched {
            Ok(values) => values,
            Err(err) => {
                warn!(?step, error = %err, "failed to fetch step options");
                let error = WizardError::CatalogUnavailable(err);
                errors.insert(BASE_FIELD, error.code());
                Vec::new()
            }
        };

        let mut options: Vec<SelectOption> = values
            .iter()
            .map(|value| SelectOption {
                label: normalize(value),
                value: value.clone(),
            })
            .collect();
        options.sort_by(|left, right| left.label.cmp(&right.label));
        self.offered = values;

        StepOutcome::Form(StepForm {
            step,
            options,
            multiple: step == Step::Types,
            errors,
            placeholders,
        })
    }
}

fn finish(
    region: String,
    area: Option<String>,
    canonical: Option<CanonicalJurisdiction>,
    types: Vec<String>,
) -> WizardResult {
    let selection = JurisdictionSelection {
        region,
        area,
        waste_types: types.into_iter().map(StreamKey).collect::<BTreeSet<_>>(),
    };
    let canonical = canonical.unwrap_or_else(|| resolver::resolve(&selection));
    debug!(unique_id = %canonical.unique_id, "wizard finished");
    WizardResult {
        selection,
        canonical,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::HashMap;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{FakeCatalog, strings};

    fn catalog() -> FakeCatalog {
        FakeCatalog {
            regions: strings(&["zurich", "basel", "st_gallen"]),
            areas: HashMap::from([
                ("zurich".to_owned(), strings(&["8050", "8001", "altstetten"])),
                ("st_gallen".to_owned(), Vec::new()),
            ]),
            types: HashMap::from([
                ("zurich".to_owned(), strings(&["paper", "cardboard", "bulky_goods"])),
                ("st_gallen".to_owned(), strings(&["waste", "organic"])),
            ]),
            ..FakeCatalog::default()
        }
    }

    fn engine(catalog: FakeCatalog) -> WizardEngine {
        WizardEngine::new(Arc::new(catalog), Vec::new())
    }

    fn form(outcome: StepOutcome) -> StepForm {
        match outcome {
            StepOutcome::Form(form) => form,
            other => panic!("expected a form, got {other:?}"),
        }
    }

    fn labels(form: &StepForm) -> Vec<&str> {
        form.options.iter().map(|option| option.label.as_str()).collect()
    }

    #[tokio::test]
    async fn region_options_are_normalized_and_sorted() {
        let mut wizard = engine(catalog());

        let form = form(wizard.present().await);

        assert_eq!(form.step, Step::Region);
        assert_eq!(labels(&form), ["Basel", "St. Gallen", "Zurich"]);
        assert_eq!(form.options[1].value, "st_gallen");
        assert!(!form.multiple, "region is single-select");
        assert!(form.errors.is_empty(), "{:?}", form.errors);
    }

    #[tokio::test]
    async fn region_fetch_failure_is_recoverable() {
        // Arrange
        let catalog = Arc::new(catalog());
        catalog.fail("regions");
        let mut wizard = WizardEngine::new(catalog.clone(), Vec::new());

        // Act
        let failed = form(wizard.present().await);
        catalog.recover("regions");
        let retried = form(wizard.present().await);

        // Assert
        assert_eq!(failed.step, Step::Region);
        assert!(failed.options.is_empty(), "no options on failure");
        assert_eq!(failed.errors.get(BASE_FIELD), Some(&"unknown"));
        assert_eq!(retried.step, Step::Region);
        assert!(retried.errors.is_empty(), "{:?}", retried.errors);
        assert_eq!(retried.options.len(), 3);
    }

    #[tokio::test]
    async fn area_step_presents_sorted_areas() {
        let mut wizard = engine(catalog());
        wizard.present().await;

        let form = form(wizard.submit(StepInput::Region("zurich".to_owned())).await);

        assert_eq!(form.step, Step::Area);
        assert_eq!(labels(&form), ["8001", "8050", "Altstetten"]);
        assert_eq!(form.placeholders.get("region").map(String::as_str), Some("Zurich"));
    }

    #[tokio::test]
    async fn region_without_areas_skips_area_step() {
        // Arrange
        let mut wizard = engine(catalog());
        wizard.present().await;

        // Act
        let types = form(wizard.submit(StepInput::Region("st_gallen".to_owned())).await);
        let done = wizard
            .submit(StepInput::Types(vec!["waste".to_owned()]))
            .await;

        // Assert
        assert_eq!(types.step, Step::Types);
        assert!(!types.placeholders.contains_key("area"), "no area placeholder");
        let StepOutcome::Done(result) = done else {
            panic!("expected done, got {done:?}");
        };
        assert_eq!(result.selection.area, None);
        assert_eq!(result.canonical.unique_id, UniqueId("st_gallen".to_owned()));
        assert_eq!(result.canonical.display_name, "St. Gallen");
    }

    #[tokio::test]
    async fn area_fetch_failure_stays_on_area_step() {
        let catalog = Arc::new(catalog());
        catalog.fail("areas");
        let mut wizard = WizardEngine::new(catalog.clone(), Vec::new());
        wizard.present().await;

        let failed = form(wizard.submit(StepInput::Region("zurich".to_owned())).await);
        catalog.recover("areas");
        let retried = form(wizard.present().await);

        assert_eq!(failed.step, Step::Area);
        assert_eq!(failed.errors.get(BASE_FIELD), Some(&"unknown"));
        assert_eq!(retried.step, Step::Area);
        assert_eq!(retried.options.len(), 3);
    }

    #[tokio::test]
    async fn full_session_produces_selection_and_canonical_name() {
        // Arrange
        let mut wizard = engine(catalog());
        wizard.present().await;
        wizard.submit(StepInput::Region("zurich".to_owned())).await;

        // Act
        let types = form(wizard.submit(StepInput::Area("altstetten".to_owned())).await);
        let done = wizard
            .submit(StepInput::Types(strings(&["paper", "bulky_goods", "paper"])))
            .await;

        // Assert
        assert!(types.multiple, "types is multi-select");
        assert_eq!(labels(&types), ["Bulky Goods", "Cardboard", "Paper"]);
        assert_eq!(types.placeholders.get("area").map(String::as_str), Some("Altstetten"));
        let StepOutcome::Done(result) = done else {
            panic!("expected done, got {done:?}");
        };
        assert_eq!(result.selection.region, "zurich");
        assert_eq!(result.selection.area.as_deref(), Some("altstetten"));
        let keys: Vec<_> = result.selection.waste_types.iter().map(StreamKey::as_str).collect();
        assert_eq!(keys, ["bulky_goods", "paper"]);
        assert_eq!(result.canonical, resolver::resolve(&result.selection));
        assert_eq!(result.canonical.display_name, "Zurich Altstetten");
        assert_eq!(wizard.step(), Step::Done);
    }

    #[tokio::test]
    async fn empty_type_selection_is_rejected() {
        let mut wizard = engine(catalog());
        wizard.present().await;
        wizard.submit(StepInput::Region("st_gallen".to_owned())).await;

        let form = form(wizard.submit(StepInput::Types(Vec::new())).await);

        assert_eq!(form.step, Step::Types);
        assert_eq!(form.errors.get(BASE_FIELD), Some(&"empty_selection"));
        assert_eq!(wizard.step(), Step::Types);
    }

    #[tokio::test]
    async fn duplicate_jurisdiction_aborts_before_types() {
        // Arrange
        let catalog = Arc::new(catalog());
        let mut wizard = WizardEngine::new(
            catalog.clone(),
            [UniqueId("zurich-8001".to_owned())],
        );
        wizard.present().await;
        wizard.submit(StepInput::Region("zurich".to_owned())).await;
        let calls_before = catalog.catalog_calls.load(Ordering::SeqCst);

        // Act
        let outcome = wizard.submit(StepInput::Area("8001".to_owned())).await;

        // Assert
        assert!(
            matches!(outcome, StepOutcome::Abort(WizardError::DuplicateJurisdiction(ref id)) if id.0 == "zurich-8001"),
            "{outcome:?}"
        );
        assert_eq!(wizard.step(), Step::Aborted);
        assert_eq!(
            catalog.catalog_calls.load(Ordering::SeqCst),
            calls_before,
            "types are not fetched for a duplicate"
        );
    }

    #[tokio::test]
    async fn other_area_of_configured_region_is_allowed() {
        let mut wizard = WizardEngine::new(
            Arc::new(catalog()),
            [UniqueId("zurich-8001".to_owned())],
        );
        wizard.present().await;
        wizard.submit(StepInput::Region("zurich".to_owned())).await;

        let form = form(wizard.submit(StepInput::Area("8050".to_owned())).await);

        assert_eq!(form.step, Step::Types);
    }

    #[tokio::test]
    async fn unoffered_value_is_rejected() {
        let mut wizard = engine(catalog());
        wizard.present().await;

        let form = form(wizard.submit(StepInput::Region("bern".to_owned())).await);

        assert_eq!(form.step, Step::Region);
        assert_eq!(form.errors.get(BASE_FIELD), Some(&"invalid_option"));
    }

    #[tokio::test]
    async fn unoffered_type_is_rejected() {
        let mut wizard = engine(catalog());
        wizard.present().await;
        wizard.submit(StepInput::Region("st_gallen".to_owned())).await;

        let form = form(wizard.submit(StepInput::Types(strings(&["waste", "glass"]))).await);

        assert_eq!(form.step, Step::Types);
        assert_eq!(form.errors.get(BASE_FIELD), Some(&"invalid_option"));
    }

    #[tokio::test]
    async fn input_for_wrong_step_does_not_advance() {
        let mut wizard = engine(catalog());
        wizard.present().await;

        let form = form(wizard.submit(StepInput::Types(strings(&["paper"]))).await);

        assert_eq!(form.step, Step::Region);
        assert_eq!(form.errors.get(BASE_FIELD), Some(&"wrong_step"));
        assert_eq!(wizard.step(), Step::Region);
    }

    #[tokio::test]
    async fn session_follows_the_transition_table() {
        let mut wizard = engine(catalog());
        wizard.present().await;
        let mut visited = vec![wizard.step()];

        wizard.submit(StepInput::Region("zurich".to_owned())).await;
        visited.push(wizard.step());
        wizard.submit(StepInput::Area("8001".to_owned())).await;
        visited.push(wizard.step());
        wizard.submit(StepInput::Types(strings(&["paper"]))).await;
        visited.push(wizard.step());

        assert_eq!(visited, [Step::Region, Step::Area, Step::Types, Step::Done]);
        for pair in visited.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
    }

    #[test]
    fn transition_table_is_strictly_forward() {
        assert_eq!(Step::Region.next(), Some(Step::Area));
        assert_eq!(Step::Area.next(), Some(Step::Types));
        assert_eq!(Step::Types.next(), Some(Step::Done));
        assert_eq!(Step::Done.next(), None);
        assert_eq!(Step::Aborted.next(), None);
    }
}
