//! Pipeline definition: the fixed, ordered stage list and its display metadata.

use serde::{Deserialize, Serialize};

use super::models::LeadStage;
use crate::errors::StoreError;

/// Color tag attached to a stage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageColor {
    Blue,
    Yellow,
    Orange,
    Purple,
    Green,
    Red,
}

impl StageColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Purple => "purple",
            Self::Green => "green",
            Self::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageInfo {
    pub id: LeadStage,
    pub label: &'static str,
    pub color: StageColor,
}

static STAGES: [StageInfo; 6] = [
    StageInfo {
        id: LeadStage::Intake,
        label: "Entrante",
        color: StageColor::Blue,
    },
    StageInfo {
        id: LeadStage::FirstCall,
        label: "Primer Llamado",
        color: StageColor::Yellow,
    },
    StageInfo {
        id: LeadStage::FollowUp,
        label: "Seguimiento",
        color: StageColor::Orange,
    },
    StageInfo {
        id: LeadStage::Negotiation,
        label: "Negociación",
        color: StageColor::Purple,
    },
    StageInfo {
        id: LeadStage::Won,
        label: "Ganado",
        color: StageColor::Green,
    },
    StageInfo {
        id: LeadStage::Lost,
        label: "Perdido",
        color: StageColor::Red,
    },
];

/// All stages in pipeline order. The first entry is the stage of every new lead.
pub fn list_stages() -> &'static [StageInfo] {
    &STAGES
}

/// True iff `value` is the wire id of a defined stage.
pub fn is_valid_stage(value: &str) -> bool {
    STAGES.iter().any(|s| s.id.as_str() == value)
}

pub fn parse_stage(value: &str) -> Result<LeadStage, StoreError> {
    if !is_valid_stage(value) {
        return Err(StoreError::validation(
            "stage",
            format!("unknown stage '{}'", value),
        ));
    }
    value
        .parse::<LeadStage>()
        .map_err(|e| StoreError::validation("stage", e))
}

pub fn stage_info(stage: LeadStage) -> &'static StageInfo {
    // STAGES is indexed in `LeadStage` declaration order.
    &STAGES[stage as usize]
}
