//! Modelo de CrewMember (personal) y AssignmentLink
//!
//! El personal se vincula a un despacho mediante `assignment_links`,
//! una tabla puente con el rol asignado y la marca de responsable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Rol del personal - mapea al ENUM crew_role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "crew_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CrewRole {
    Driver,
    Paramedic,
    Physician,
    Nurse,
}

impl CrewRole {
    pub const ALL: [CrewRole; 4] = [
        CrewRole::Driver,
        CrewRole::Paramedic,
        CrewRole::Physician,
        CrewRole::Nurse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrewRole::Driver => "driver",
            CrewRole::Paramedic => "paramedic",
            CrewRole::Physician => "physician",
            CrewRole::Nurse => "nurse",
        }
    }
}

impl fmt::Display for CrewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrewRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driver" => Ok(CrewRole::Driver),
            "paramedic" => Ok(CrewRole::Paramedic),
            "physician" => Ok(CrewRole::Physician),
            "nurse" => Ok(CrewRole::Nurse),
            other => Err(format!("unknown crew role '{}'", other)),
        }
    }
}

/// Estado del personal - mapea al ENUM crew_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[sqlx(type_name = "crew_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CrewStatus {
    Available,
    InService,
    Resting,
    OnLeave,
}

impl CrewStatus {
    pub const ALL: [CrewStatus; 4] = [
        CrewStatus::Available,
        CrewStatus::InService,
        CrewStatus::Resting,
        CrewStatus::OnLeave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrewStatus::Available => "available",
            CrewStatus::InService => "in_service",
            CrewStatus::Resting => "resting",
            CrewStatus::OnLeave => "on_leave",
        }
    }
}

impl fmt::Display for CrewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(CrewStatus::Available),
            "in_service" => Ok(CrewStatus::InService),
            "resting" => Ok(CrewStatus::Resting),
            "on_leave" => Ok(CrewStatus::OnLeave),
            other => Err(format!("unknown crew status '{}'", other)),
        }
    }
}

/// Miembro del personal - mapea a la tabla crew_members
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CrewMember {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub role: CrewRole,
    pub specialty: Option<String>,
    pub experience_years: i32,
    pub status: CrewStatus,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CrewMember {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Datos para registrar personal nuevo
#[derive(Debug, Clone)]
pub struct NewCrewMember {
    pub first_name: String,
    pub last_name: String,
    pub national_id: String,
    pub role: CrewRole,
    pub specialty: Option<String>,
    pub experience_years: i32,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Vínculo despacho-personal; (dispatch_id, crew_member_id) es único
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssignmentLink {
    pub id: i64,
    pub dispatch_id: i64,
    pub crew_member_id: i64,
    pub role: CrewRole,
    pub responsible: bool,
    pub created_at: DateTime<Utc>,
}

/// Personal asignado a un despacho, con los datos del vínculo
#[derive(Debug, Clone, Serialize)]
pub struct AssignedCrew {
    pub member: CrewMember,
    pub role: CrewRole,
    pub responsible: bool,
}

/// Dos asignaciones son iguales si vinculan al mismo miembro con el mismo rol
impl PartialEq for AssignedCrew {
    fn eq(&self, other: &Self) -> bool {
        self.member.id == other.member.id
            && self.role == other.role
            && self.responsible == other.responsible
    }
}

/// Cupos por rol requeridos para dotar un despacho
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleQuotas(pub BTreeMap<CrewRole, u32>);

impl RoleQuotas {
    pub fn new(quotas: impl IntoIterator<Item = (CrewRole, u32)>) -> Self {
        Self(quotas.into_iter().filter(|(_, n)| *n > 0).collect())
    }

    /// Total de personas requeridas
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CrewRole, u32)> + '_ {
        self.0.iter().map(|(role, n)| (*role, *n))
    }
}

/// Un conductor y un paramédico
impl Default for RoleQuotas {
    fn default() -> Self {
        Self::new([(CrewRole::Driver, 1), (CrewRole::Paramedic, 1)])
    }
}

/// Filtros para búsqueda de personal
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrewFilter {
    pub status: Option<CrewStatus>,
    pub role: Option<CrewRole>,
}

impl CrewFilter {
    pub fn matches(&self, member: &CrewMember) -> bool {
        self.status.map_or(true, |s| member.status == s)
            && self.role.map_or(true, |r| member.role == r)
    }
}
