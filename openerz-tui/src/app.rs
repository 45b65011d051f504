use std::collections::BTreeSet;

use openerz_core::{
    model::EntryId,
    service::OpenErzService,
    wizard::{Step, StepForm, StepInput, StepOutcome, WizardEngine, WizardError, WizardResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Entries,
    Wizard,
    Sensors,
}

pub(crate) struct App {
    pub service: OpenErzService,

    pub screen: Screen,
    pub entry_list_index: usize,
    pub selected_entry: Option<EntryId>,

    pub wizard: Option<WizardEngine>,
    pub form: Option<StepForm>,
    pub option_index: usize,
    pub checked: BTreeSet<usize>,

    pub is_loading: bool,
    pub error_message: Option<String>,
}

impl App {
    pub(crate) fn new(service: OpenErzService) -> Self {
        Self {
            service,
            screen: Screen::Entries,
            entry_list_index: 0,
            selected_entry: None,
            wizard: None,
            form: None,
            option_index: 0,
            checked: BTreeSet::new(),
            is_loading: false,
            error_message: None,
        }
    }

    pub(crate) fn entry_ids(&self) -> Vec<EntryId> {
        self.service
            .registry()
            .iter()
            .map(|registered| registered.entry.entry_id)
            .collect()
    }

    pub(crate) fn highlighted_entry(&self) -> Option<EntryId> {
        self.entry_ids().get(self.entry_list_index).copied()
    }

    pub(crate) fn open_highlighted_entry(&mut self) {
        if let Some(id) = self.highlighted_entry() {
            self.selected_entry = Some(id);
            self.screen = Screen::Sensors;
        }
    }

    pub(crate) fn start_wizard(&mut self) {
        self.wizard = Some(self.service.start_wizard());
        self.form = None;
        self.screen = Screen::Wizard;
    }

    pub(crate) fn cancel_wizard(&mut self) {
        self.wizard = None;
        self.form = None;
        self.screen = Screen::Entries;
    }

    pub(crate) fn toggle_current_option(&mut self) {
        if !self.form.as_ref().is_some_and(|form| form.multiple) {
            return;
        }
        if !self.checked.remove(&self.option_index) {
            self.checked.insert(self.option_index);
        }
    }

    /// Answer for the presented step from the highlighted or checked options.
    pub(crate) fn current_input(&self) -> Option<StepInput> {
        let form = self.form.as_ref()?;
        let value_at = |index: &usize| form.options.get(*index).map(|option| option.value.clone());

        match form.step {
            Step::Region => value_at(&self.option_index).map(StepInput::Region),
            Step::Area => value_at(&self.option_index).map(StepInput::Area),
            Step::Types => Some(StepInput::Types(
                self.checked.iter().filter_map(value_at).collect(),
            )),
            Step::Done | Step::Aborted => None,
        }
    }

    /// Show a new form; returns the finished selection once the wizard is done.
    pub(crate) fn apply_outcome(&mut self, outcome: StepOutcome) -> Option<WizardResult> {
        match outcome {
            StepOutcome::Form(form) => {
                let same_step = self.form.as_ref().is_some_and(|shown| shown.step == form.step);
                if !same_step {
                    self.option_index = 0;
                    self.checked.clear();
                }
                self.option_index = self.option_index.min(form.options.len().saturating_sub(1));
                self.error_message = form.errors.values().next().map(|code| describe_code(code));
                self.form = Some(form);
                None
            }
            StepOutcome::Abort(error) => {
                self.cancel_wizard();
                self.error_message = Some(match &error {
                    WizardError::DuplicateJurisdiction(id) => {
                        format!("{id} is already configured")
                    }
                    other => other.to_string(),
                });
                None
            }
            StepOutcome::Done(result) => {
                self.cancel_wizard();
                self.error_message = None;
                Some(result)
            }
        }
    }
}

fn describe_code(code: &str) -> String {
    match code {
        "unknown" => "Could not reach the catalog, press r to retry".to_owned(),
        "empty_selection" => "Please select at least one waste type".to_owned(),
        "invalid_option" => "That option is no longer offered".to_owned(),
        other => format!("Error: {other}"),
    }
}
