//! Page-view seam and dashboard bindings.
//!
//! The controller never touches a concrete UI. Visibility, error text, the
//! file label and the step indicator go through [`PageView`]; dashboard
//! values go through [`ViewBindings`], a map from logical target to an update
//! function supplied by the front end.

use std::{collections::HashMap, fmt};

use crate::steps::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageSection {
    Upload,
    Progress,
    Result,
}

impl PageSection {
    pub fn element_id(self) -> &'static str {
        match self {
            PageSection::Upload => "uploadSection",
            PageSection::Progress => "progressSection",
            PageSection::Result => "resultSection",
        }
    }
}

pub trait PageView: Send + Sync {
    fn set_error(&self, message: &str);
    fn set_visible(&self, section: PageSection, visible: bool);
    fn set_file_label(&self, label: &str);
    fn render_steps(&self, steps: &[Step]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DashboardTarget {
    LastName,
    FirstName,
    IdNumber,
    Gender,
    Phone,
    Mobile,
    Address,
    InjuryDate,
    InjuryTime,
    AccidentLocation,
    InjuredBodyPart,
    HealthFund,
    AccidentNature,
    Diagnoses,
    AccidentDescription,
    AccidentAddress,
}

impl DashboardTarget {
    pub const ALL: [DashboardTarget; 16] = [
        DashboardTarget::LastName,
        DashboardTarget::FirstName,
        DashboardTarget::IdNumber,
        DashboardTarget::Gender,
        DashboardTarget::Phone,
        DashboardTarget::Mobile,
        DashboardTarget::Address,
        DashboardTarget::InjuryDate,
        DashboardTarget::InjuryTime,
        DashboardTarget::AccidentLocation,
        DashboardTarget::InjuredBodyPart,
        DashboardTarget::HealthFund,
        DashboardTarget::AccidentNature,
        DashboardTarget::Diagnoses,
        DashboardTarget::AccidentDescription,
        DashboardTarget::AccidentAddress,
    ];

    pub fn element_id(self) -> &'static str {
        match self {
            DashboardTarget::LastName => "lastName",
            DashboardTarget::FirstName => "firstName",
            DashboardTarget::IdNumber => "idNumber",
            DashboardTarget::Gender => "gender",
            DashboardTarget::Phone => "phone",
            DashboardTarget::Mobile => "mobile",
            DashboardTarget::Address => "address",
            DashboardTarget::InjuryDate => "injuryDate",
            DashboardTarget::InjuryTime => "injuryTime",
            DashboardTarget::AccidentLocation => "accidentLocation",
            DashboardTarget::InjuredBodyPart => "injuredBodyPart",
            DashboardTarget::HealthFund => "healthFund",
            DashboardTarget::AccidentNature => "accidentNature",
            DashboardTarget::Diagnoses => "diagnoses",
            DashboardTarget::AccidentDescription => "accidentDescription",
            DashboardTarget::AccidentAddress => "accidentAddress",
        }
    }

    pub fn caption(self) -> &'static str {
        match self {
            DashboardTarget::LastName => "Last name",
            DashboardTarget::FirstName => "First name",
            DashboardTarget::IdNumber => "ID number",
            DashboardTarget::Gender => "Gender",
            DashboardTarget::Phone => "Phone",
            DashboardTarget::Mobile => "Mobile",
            DashboardTarget::Address => "Address",
            DashboardTarget::InjuryDate => "Date of injury",
            DashboardTarget::InjuryTime => "Time of injury",
            DashboardTarget::AccidentLocation => "Accident location",
            DashboardTarget::InjuredBodyPart => "Injured body part",
            DashboardTarget::HealthFund => "Health fund",
            DashboardTarget::AccidentNature => "Accident type",
            DashboardTarget::Diagnoses => "Diagnoses",
            DashboardTarget::AccidentDescription => "Accident description",
            DashboardTarget::AccidentAddress => "Accident address",
        }
    }
}

type Binding = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
pub struct ViewBindings {
    bindings: HashMap<DashboardTarget, Binding>,
}

impl ViewBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(
        mut self,
        target: DashboardTarget,
        update: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.insert(target, update);
        self
    }

    pub fn insert(
        &mut self,
        target: DashboardTarget,
        update: impl Fn(&str) + Send + Sync + 'static,
    ) {
        self.bindings.insert(target, Box::new(update));
    }

    /// Returns `false` when nothing is bound to `target`.
    pub fn update(&self, target: DashboardTarget, text: &str) -> bool {
        match self.bindings.get(&target) {
            Some(update) => {
                update(text);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ViewBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<_> = self.bindings.keys().copied().collect();
        targets.sort();
        f.debug_struct("ViewBindings")
            .field("targets", &targets)
            .finish()
    }
}
