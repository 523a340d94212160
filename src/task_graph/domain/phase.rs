//! Canonical construction phases.

use super::{PhaseId, PhaseStatus, ProjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the nine canonical construction phases, in build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    /// Survey, clearing, grading, and temporary utilities.
    SitePrep,
    /// Excavation, footings, and foundation walls.
    Foundation,
    /// Walls, joists, trusses, and sheathing.
    Framing,
    /// Underlayment, roofing material, and gutters.
    Roofing,
    /// Mechanical, electrical, and plumbing rough-in.
    Mep,
    /// Insulation, drywall, finishes, and fixtures.
    Interior,
    /// Siding, windows, doors, and flatwork.
    Exterior,
    /// Final grading, irrigation, and planting.
    Landscape,
    /// Cleaning, final inspection, and handover.
    Final,
}

impl PhaseKind {
    /// All phases in build order.
    pub const ALL: [Self; 9] = [
        Self::SitePrep,
        Self::Foundation,
        Self::Framing,
        Self::Roofing,
        Self::Mep,
        Self::Interior,
        Self::Exterior,
        Self::Landscape,
        Self::Final,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SitePrep => "site_prep",
            Self::Foundation => "foundation",
            Self::Framing => "framing",
            Self::Roofing => "roofing",
            Self::Mep => "mep",
            Self::Interior => "interior",
            Self::Exterior => "exterior",
            Self::Landscape => "landscape",
            Self::Final => "final",
        }
    }

    /// Returns the standard task titles seeded into a new phase.
    #[must_use]
    pub const fn standard_tasks(self) -> &'static [&'static str] {
        match self {
            Self::SitePrep => &[
                "Survey and stake property boundaries",
                "Clear and grade lot",
                "Install temporary utilities",
                "Set up erosion control",
            ],
            Self::Foundation => &[
                "Excavate for foundation",
                "Install footings",
                "Pour foundation walls",
                "Waterproof foundation",
                "Foundation inspection",
            ],
            Self::Framing => &[
                "Frame first floor walls",
                "Install floor joists/trusses",
                "Frame second floor (if applicable)",
                "Install roof trusses",
                "Sheath exterior walls and roof",
                "Framing inspection",
            ],
            Self::Roofing => &[
                "Install roofing underlayment",
                "Install roofing material",
                "Install flashing and vents",
                "Gutter installation",
            ],
            Self::Mep => &[
                "Rough-in plumbing",
                "Rough-in electrical",
                "Install HVAC ductwork",
                "MEP rough-in inspection",
            ],
            Self::Interior => &[
                "Install insulation",
                "Hang drywall",
                "Tape and finish drywall",
                "Install interior doors and trim",
                "Paint interior",
                "Install flooring",
                "Install cabinets and countertops",
                "Install fixtures and hardware",
            ],
            Self::Exterior => &[
                "Install siding/exterior finish",
                "Install windows and exterior doors",
                "Paint/stain exterior",
                "Concrete flatwork (driveway, walkways)",
            ],
            Self::Landscape => &[
                "Final grading",
                "Install irrigation",
                "Plant landscaping",
                "Install exterior lighting",
            ],
            Self::Final => &[
                "Final cleaning",
                "Final inspection",
                "Certificate of occupancy",
                "Homeowner walkthrough",
                "Punch list completion",
            ],
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase belonging to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    id: PhaseId,
    project_id: ProjectId,
    kind: PhaseKind,
    position: u8,
    status: PhaseStatus,
}

impl Phase {
    /// Creates a phase that has not started.
    #[must_use]
    pub fn new(project_id: ProjectId, kind: PhaseKind, position: u8) -> Self {
        Self {
            id: PhaseId::new(),
            project_id,
            kind,
            position,
            status: PhaseStatus::NotStarted,
        }
    }

    /// Returns the phase identifier.
    #[must_use]
    pub const fn id(&self) -> PhaseId {
        self.id
    }

    /// Returns the owning project.
    #[must_use]
    pub const fn project_id(&self) -> ProjectId {
        self.project_id
    }

    /// Returns the canonical phase kind.
    #[must_use]
    pub const fn kind(&self) -> PhaseKind {
        self.kind
    }

    /// Returns the zero-based build order position.
    #[must_use]
    pub const fn position(&self) -> u8 {
        self.position
    }

    /// Returns the derived status.
    #[must_use]
    pub const fn status(&self) -> PhaseStatus {
        self.status
    }

    /// Replaces the derived status, returning the previous value.
    pub const fn set_status(&mut self, status: PhaseStatus) -> PhaseStatus {
        let previous = self.status;
        self.status = status;
        previous
    }
}
