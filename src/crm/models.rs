use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// Position of a lead in the sales pipeline. The set is closed and ordered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LeadStage {
    #[default]
    #[serde(rename = "entrante")]
    Intake,
    #[serde(rename = "primer-llamado")]
    FirstCall,
    #[serde(rename = "seguimiento")]
    FollowUp,
    #[serde(rename = "negociacion")]
    Negotiation,
    #[serde(rename = "ganado")]
    Won,
    #[serde(rename = "perdido")]
    Lost,
}

impl LeadStage {
    pub const ALL: [LeadStage; 6] = [
        Self::Intake,
        Self::FirstCall,
        Self::FollowUp,
        Self::Negotiation,
        Self::Won,
        Self::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "entrante",
            Self::FirstCall => "primer-llamado",
            Self::FollowUp => "seguimiento",
            Self::Negotiation => "negociacion",
            Self::Won => "ganado",
            Self::Lost => "perdido",
        }
    }
}

impl std::fmt::Display for LeadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrante" => Ok(Self::Intake),
            "primer-llamado" => Ok(Self::FirstCall),
            "seguimiento" => Ok(Self::FollowUp),
            "negociacion" => Ok(Self::Negotiation),
            "ganado" => Ok(Self::Won),
            "perdido" => Ok(Self::Lost),
            _ => Err(format!("Invalid stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Alfajores,
    Galletitas,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alfajores => "alfajores",
            Self::Galletitas => "galletitas",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Alfajores => "Alfajores",
            Self::Galletitas => "Galletitas",
        }
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alfajores" => Ok(Self::Alfajores),
            "galletitas" => Ok(Self::Galletitas),
            _ => Err(format!("Invalid product: {}", s)),
        }
    }
}

/// Whether the prospect already owns a registered brand or running project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrandOwnership {
    #[serde(rename = "si")]
    Yes,
    #[serde(rename = "no")]
    No,
}

impl BrandOwnership {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "si",
            Self::No => "no",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Yes => "Sí",
            Self::No => "No",
        }
    }
}

impl FromStr for BrandOwnership {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "si" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            _ => Err(format!("Invalid brand flag: {}", s)),
        }
    }
}

/// Estimated monthly volume, in units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeBucket {
    #[serde(rename = "menos-1000")]
    Under1000,
    #[serde(rename = "1000-5000")]
    From1000To5000,
    #[serde(rename = "mas-5000")]
    Over5000,
}

impl VolumeBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Under1000 => "menos-1000",
            Self::From1000To5000 => "1000-5000",
            Self::Over5000 => "mas-5000",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Under1000 => "Menos de 1.000 unidades",
            Self::From1000To5000 => "1.000 - 5.000 unidades",
            Self::Over5000 => "Más de 5.000 unidades",
        }
    }
}

impl FromStr for VolumeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "menos-1000" => Ok(Self::Under1000),
            "1000-5000" => Ok(Self::From1000To5000),
            "mas-5000" => Ok(Self::Over5000),
            _ => Err(format!("Invalid volume: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackagingType {
    #[serde(rename = "flowpack-personalizado")]
    CustomFlowpack,
    #[serde(rename = "flowpack-cristal")]
    ClearFlowpack,
    #[serde(rename = "a-granel")]
    Bulk,
}

impl PackagingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomFlowpack => "flowpack-personalizado",
            Self::ClearFlowpack => "flowpack-cristal",
            Self::Bulk => "a-granel",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomFlowpack => "Flow pack personalizado",
            Self::ClearFlowpack => "Flowpack cristal",
            Self::Bulk => "A granel",
        }
    }
}

impl FromStr for PackagingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flowpack-personalizado" => Ok(Self::CustomFlowpack),
            "flowpack-cristal" => Ok(Self::ClearFlowpack),
            "a-granel" => Ok(Self::Bulk),
            _ => Err(format!("Invalid packaging: {}", s)),
        }
    }
}

/// A sales prospect tracked through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub product: ProductType,
    pub brand: BrandOwnership,
    pub volume: VolumeBucket,
    pub packaging: PackagingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_investment: Option<String>,
    pub stage: LeadStage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
}

impl Lead {
    /// Build a freshly created lead. The stage is always the first pipeline stage.
    pub fn from_new(id: String, new: NewLead, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            company: new.company,
            email: new.email,
            phone: new.phone,
            product: new.product,
            brand: new.brand,
            volume: new.volume,
            packaging: new.packaging,
            message: new.message,
            estimated_investment: new.estimated_investment,
            stage: LeadStage::Intake,
            created_at: now,
            updated_at: now,
            notes: Vec::new(),
            last_contact: None,
        }
    }

    /// Stamp `updated_at`. The stamp never repeats and never moves backwards,
    /// even when the wall clock does.
    pub fn touch(&mut self) {
        let now = now_micros();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + chrono::Duration::microseconds(1)
        };
    }
}

/// Current time truncated to the microsecond precision used in storage.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Validated fields for a new lead. Stage, id and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub product: ProductType,
    pub brand: BrandOwnership,
    pub volume: VolumeBucket,
    pub packaging: PackagingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_investment: Option<String>,
}

/// Typed partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<BrandOwnership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<PackagingType>,
    /// An empty string clears the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// An empty string clears the estimate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_investment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<LeadStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_contact: Option<DateTime<Utc>>,
}

impl LeadUpdate {
    pub fn stage(stage: LeadStage) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the update into `lead`. Does not touch `updated_at`.
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(ref v) = self.name {
            lead.name = v.clone();
        }
        if let Some(ref v) = self.company {
            lead.company = v.clone();
        }
        if let Some(ref v) = self.email {
            lead.email = v.clone();
        }
        if let Some(ref v) = self.phone {
            lead.phone = v.clone();
        }
        if let Some(v) = self.product {
            lead.product = v;
        }
        if let Some(v) = self.brand {
            lead.brand = v;
        }
        if let Some(v) = self.volume {
            lead.volume = v;
        }
        if let Some(v) = self.packaging {
            lead.packaging = v;
        }
        if let Some(ref v) = self.message {
            lead.message = non_blank(v);
        }
        if let Some(ref v) = self.estimated_investment {
            lead.estimated_investment = non_blank(v);
        }
        if let Some(v) = self.stage {
            lead.stage = v;
        }
        if let Some(ref v) = self.notes {
            lead.notes = v.clone();
        }
        if let Some(v) = self.last_contact {
            lead.last_contact = Some(v);
        }
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ── Wire payloads ─────────────────────────────────────────────────────
//
// Closed-enum fields arrive as plain strings so that a bad value becomes a
// `StoreError::Validation` (400) instead of a JSON rejection.

/// Body of `POST /api/leads` and `POST /api/contact`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadInput {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "empresa")]
    pub company: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: Option<String>,
    #[serde(alias = "producto")]
    pub product: Option<String>,
    #[serde(alias = "marca")]
    pub brand: Option<String>,
    #[serde(alias = "volumen")]
    pub volume: Option<String>,
    #[serde(alias = "envasado")]
    pub packaging: Option<String>,
    #[serde(alias = "mensaje")]
    pub message: Option<String>,
    #[serde(alias = "inversionEstimada")]
    pub estimated_investment: Option<String>,
}

impl LeadInput {
    pub fn validate(self) -> Result<NewLead, StoreError> {
        let name = required_text("name", self.name)?;
        let company = required_text("company", self.company)?;
        let email = required_email(self.email)?;
        let phone = required_text("phone", self.phone)?;
        let product = required_enum("product", self.product)?;
        let brand = required_enum("brand", self.brand)?;
        let volume = required_enum("volume", self.volume)?;
        let packaging = required_enum("packaging", self.packaging)?;

        Ok(NewLead {
            name,
            company,
            email,
            phone,
            product,
            brand,
            volume,
            packaging,
            message: self.message.as_deref().and_then(non_blank),
            estimated_investment: self.estimated_investment.as_deref().and_then(non_blank),
        })
    }
}

/// Body of `PUT /api/leads/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(alias = "nombre")]
    pub name: Option<String>,
    #[serde(alias = "empresa")]
    pub company: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "telefono")]
    pub phone: Option<String>,
    #[serde(alias = "producto")]
    pub product: Option<String>,
    #[serde(alias = "marca")]
    pub brand: Option<String>,
    #[serde(alias = "volumen")]
    pub volume: Option<String>,
    #[serde(alias = "envasado")]
    pub packaging: Option<String>,
    #[serde(alias = "mensaje")]
    pub message: Option<String>,
    #[serde(alias = "inversionEstimada")]
    pub estimated_investment: Option<String>,
    pub stage: Option<String>,
    pub notes: Option<Vec<String>>,
    pub last_contact: Option<DateTime<Utc>>,
}

impl LeadPatch {
    pub fn validate(self) -> Result<LeadUpdate, StoreError> {
        let stage = match self.stage {
            Some(s) => Some(super::stages::parse_stage(&s)?),
            None => None,
        };
        let email = match self.email {
            Some(e) => Some(required_email(Some(e))?),
            None => None,
        };

        Ok(LeadUpdate {
            name: optional_required_text("name", self.name)?,
            company: optional_required_text("company", self.company)?,
            email,
            phone: optional_required_text("phone", self.phone)?,
            product: optional_enum("product", self.product)?,
            brand: optional_enum("brand", self.brand)?,
            volume: optional_enum("volume", self.volume)?,
            packaging: optional_enum("packaging", self.packaging)?,
            message: self.message,
            estimated_investment: self.estimated_investment,
            stage,
            notes: self.notes,
            last_contact: self.last_contact,
        })
    }
}

fn required_text(field: &str, value: Option<String>) -> Result<String, StoreError> {
    value
        .as_deref()
        .and_then(non_blank)
        .ok_or_else(|| StoreError::validation(field, "is required"))
}

fn optional_required_text(field: &str, value: Option<String>) -> Result<Option<String>, StoreError> {
    match value {
        Some(v) => required_text(field, Some(v)).map(Some),
        None => Ok(None),
    }
}

fn required_email(value: Option<String>) -> Result<String, StoreError> {
    let email = required_text("email", value)?;
    if !email.contains('@') {
        return Err(StoreError::validation(
            "email",
            format!("'{}' is not an email address", email),
        ));
    }
    Ok(email)
}

fn required_enum<T>(field: &str, value: Option<String>) -> Result<T, StoreError>
where
    T: FromStr<Err = String>,
{
    let raw = required_text(field, value)?;
    T::from_str(&raw).map_err(|e| StoreError::validation(field, e))
}

fn optional_enum<T>(field: &str, value: Option<String>) -> Result<Option<T>, StoreError>
where
    T: FromStr<Err = String>,
{
    match value {
        Some(v) => required_enum(field, Some(v)).map(Some),
        None => Ok(None),
    }
}

// ── View types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStats {
    pub total: usize,
    pub won: usize,
    /// Won over total, as a percentage rounded to one decimal.
    pub conversion_rate: f64,
}

impl LeadStats {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let total = leads.len();
        let won = leads.iter().filter(|l| l.stage == LeadStage::Won).count();
        let conversion_rate = if total == 0 {
            0.0
        } else {
            (won as f64 / total as f64 * 1000.0).round() / 10.0
        };
        Self {
            total,
            won,
            conversion_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub stage: LeadStage,
    pub label: String,
    pub color: super::stages::StageColor,
    pub count: usize,
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
    pub stats: LeadStats,
}

/// Result of a store health probe (`GET /api/db/check`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStatus {
    pub connected: bool,
    pub table_exists: bool,
    pub lead_count: usize,
    pub timestamp: DateTime<Utc>,
}
