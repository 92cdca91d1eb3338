use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// FHIR resource types known to the search core.
///
/// Unknown but well-formed names round-trip through `Custom` so that
/// profile-defined resource types remain searchable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Practitioner,
    PractitionerRole,
    RelatedPerson,
    Person,
    Group,
    Device,
    Organization,
    Location,
    Encounter,
    EpisodeOfCare,
    Observation,
    Condition,
    Procedure,
    DiagnosticReport,
    Specimen,
    Immunization,
    AllergyIntolerance,
    CarePlan,
    CareTeam,
    Medication,
    MedicationRequest,
    MedicationAdministration,
    MedicationStatement,
    ServiceRequest,
    DocumentReference,
    Bundle,
    CapabilityStatement,
    StructureDefinition,
    ValueSet,
    CodeSystem,
    SearchParameter,
    OperationOutcome,
    #[serde(untagged)]
    Custom(String),
}

impl ResourceType {
    /// The canonical FHIR code for this resource type.
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::PractitionerRole => "PractitionerRole",
            ResourceType::RelatedPerson => "RelatedPerson",
            ResourceType::Person => "Person",
            ResourceType::Group => "Group",
            ResourceType::Device => "Device",
            ResourceType::Organization => "Organization",
            ResourceType::Location => "Location",
            ResourceType::Encounter => "Encounter",
            ResourceType::EpisodeOfCare => "EpisodeOfCare",
            ResourceType::Observation => "Observation",
            ResourceType::Condition => "Condition",
            ResourceType::Procedure => "Procedure",
            ResourceType::DiagnosticReport => "DiagnosticReport",
            ResourceType::Specimen => "Specimen",
            ResourceType::Immunization => "Immunization",
            ResourceType::AllergyIntolerance => "AllergyIntolerance",
            ResourceType::CarePlan => "CarePlan",
            ResourceType::CareTeam => "CareTeam",
            ResourceType::Medication => "Medication",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::MedicationAdministration => "MedicationAdministration",
            ResourceType::MedicationStatement => "MedicationStatement",
            ResourceType::ServiceRequest => "ServiceRequest",
            ResourceType::DocumentReference => "DocumentReference",
            ResourceType::Bundle => "Bundle",
            ResourceType::CapabilityStatement => "CapabilityStatement",
            ResourceType::StructureDefinition => "StructureDefinition",
            ResourceType::ValueSet => "ValueSet",
            ResourceType::CodeSystem => "CodeSystem",
            ResourceType::SearchParameter => "SearchParameter",
            ResourceType::OperationOutcome => "OperationOutcome",
            ResourceType::Custom(name) => name,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceType::Patient),
            "Practitioner" => Ok(ResourceType::Practitioner),
            "PractitionerRole" => Ok(ResourceType::PractitionerRole),
            "RelatedPerson" => Ok(ResourceType::RelatedPerson),
            "Person" => Ok(ResourceType::Person),
            "Group" => Ok(ResourceType::Group),
            "Device" => Ok(ResourceType::Device),
            "Organization" => Ok(ResourceType::Organization),
            "Location" => Ok(ResourceType::Location),
            "Encounter" => Ok(ResourceType::Encounter),
            "EpisodeOfCare" => Ok(ResourceType::EpisodeOfCare),
            "Observation" => Ok(ResourceType::Observation),
            "Condition" => Ok(ResourceType::Condition),
            "Procedure" => Ok(ResourceType::Procedure),
            "DiagnosticReport" => Ok(ResourceType::DiagnosticReport),
            "Specimen" => Ok(ResourceType::Specimen),
            "Immunization" => Ok(ResourceType::Immunization),
            "AllergyIntolerance" => Ok(ResourceType::AllergyIntolerance),
            "CarePlan" => Ok(ResourceType::CarePlan),
            "CareTeam" => Ok(ResourceType::CareTeam),
            "Medication" => Ok(ResourceType::Medication),
            "MedicationRequest" => Ok(ResourceType::MedicationRequest),
            "MedicationAdministration" => Ok(ResourceType::MedicationAdministration),
            "MedicationStatement" => Ok(ResourceType::MedicationStatement),
            "ServiceRequest" => Ok(ResourceType::ServiceRequest),
            "DocumentReference" => Ok(ResourceType::DocumentReference),
            "Bundle" => Ok(ResourceType::Bundle),
            "CapabilityStatement" => Ok(ResourceType::CapabilityStatement),
            "StructureDefinition" => Ok(ResourceType::StructureDefinition),
            "ValueSet" => Ok(ResourceType::ValueSet),
            "CodeSystem" => Ok(ResourceType::CodeSystem),
            "SearchParameter" => Ok(ResourceType::SearchParameter),
            "OperationOutcome" => Ok(ResourceType::OperationOutcome),
            name => {
                if is_valid_resource_type_name(name) {
                    Ok(ResourceType::Custom(name.to_string()))
                } else {
                    Err(CoreError::invalid_resource_type(name.to_string()))
                }
            }
        }
    }
}

/// Validate if a string is a valid FHIR resource type name
pub fn is_valid_resource_type_name(name: &str) -> bool {
    // FHIR resource type names must start with uppercase letter and contain only letters
    !name.is_empty()
        && name
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphabetic())
}
