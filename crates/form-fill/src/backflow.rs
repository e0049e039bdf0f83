//! Backflow prevention assembly test reports
//!
//! A test record is written into the state's fillable test-report form
//! (TCEQ) by field name. When no template is configured, or the template
//! cannot be filled, a plain reference sheet is rendered instead so the
//! technician always gets a document back.

use crate::named::fill_named_fields;
use crate::parser::value_to_string;
use crate::reference::render_reference_sheet;
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// A form value that may arrive as a string, number, boolean or null
///
/// Readings are typed into numeric inputs on some clients and text inputs on
/// others; every shape is kept as its display string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormValue(String);

impl FormValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for FormValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(value_to_string(&value)))
    }
}

/// The assembly under test
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Device {
    pub type_main: FormValue,
    pub manufacturer_main: FormValue,
    pub model_main: FormValue,
    pub size_main: FormValue,
    pub serial_main: FormValue,
    pub manufacturer_bypass: FormValue,
    pub model_bypass: FormValue,
    pub serial_bypass: FormValue,
    pub size_bypass: FormValue,
    pub bpa_location: FormValue,
    pub bpa_serves: FormValue,
}

/// Readings and observations from one test visit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestRecord {
    pub reason_for_test: FormValue,
    pub old_serial: FormValue,
    pub installed_per_code: FormValue,
    pub installed_on_non_potable_auxiliary: FormValue,
    pub test_date_initial: FormValue,
    pub test_time_initial: FormValue,
    pub test_result: FormValue,
    pub differential_pressure_gauge_type: FormValue,

    pub first_check_reading_initial: FormValue,
    pub second_check_reading_initial: FormValue,
    pub relief_valve_reading_initial: FormValue,
    #[serde(rename = "typeIIBypassCheckReadingInitial")]
    pub type_ii_bypass_check_reading_initial: FormValue,
    pub air_inlet_reading_initial: FormValue,
    pub check_valve_reading_initial: FormValue,

    pub first_check_closed_tight_initial: FormValue,
    pub second_check_closed_tight_initial: FormValue,
    pub relief_valve_did_not_open_initial: FormValue,
    pub air_inlet_did_not_open_initial: FormValue,
    pub check_valve_leaked_initial: FormValue,

    pub repairs_main: FormValue,
    pub repairs_bypass: FormValue,

    pub first_check_reading_after_repair: FormValue,
    pub second_check_reading_after_repair: FormValue,
    pub relief_valve_reading_after_repair: FormValue,
    #[serde(rename = "typeIIBypassCheckReadingAfterRepair")]
    pub type_ii_bypass_check_reading_after_repair: FormValue,
    pub air_inlet_reading_after_repair: FormValue,
    pub check_valve_reading_after_repair: FormValue,
    pub test_date_after_repair: FormValue,
    pub test_time_after_repair: FormValue,

    pub first_check_closed_tight_after_repair: FormValue,
    pub second_check_closed_tight_after_repair: FormValue,
    #[serde(rename = "typeIIBypassClosedTightAfterRepair")]
    pub type_ii_bypass_closed_tight_after_repair: FormValue,
}

/// The certified tester
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Technician {
    pub name: FormValue,
    pub bpat_license_number: FormValue,
    pub license_expiration_date: FormValue,
}

/// The testing company
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Company {
    pub name: FormValue,
    pub phone: FormValue,
    pub address: FormValue,
}

/// Public water supplier details for the city the device is in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CityInfo {
    pub pws_name: FormValue,
    pub pws_id: FormValue,
    pub pws_address: FormValue,
    pub pws_contact: FormValue,
}

/// Everything needed to produce one test report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackflowRecord {
    pub device: Device,
    pub test: TestRecord,
    pub technician: Technician,
    pub company: Company,
    pub city_info: CityInfo,
    pub city_code: String,
    pub customer_name: String,
    pub service_address: String,
}

impl BackflowRecord {
    /// `TCEQ_{serial}_{date}.pdf`, with `unknown` for missing parts
    pub fn report_file_name(&self) -> String {
        format!(
            "TCEQ_{}_{}.pdf",
            or_unknown(&self.device.serial_main),
            or_unknown(&self.test.test_date_initial)
        )
    }

    /// `Online_Reference_{serial}_{date}.pdf`, with `unknown` for missing parts
    pub fn reference_file_name(&self) -> String {
        format!(
            "Online_Reference_{}_{}.pdf",
            or_unknown(&self.device.serial_main),
            or_unknown(&self.test.test_date_initial)
        )
    }

    fn gauge_is_potable(&self) -> bool {
        let gauge = &self.test.differential_pressure_gauge_type;
        gauge.is_empty() || gauge.as_str() == "Potable"
    }
}

fn or_unknown(value: &FormValue) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value.as_str()
    }
}

const DEVICE_TYPE_BOXES: &[(&str, &str)] = &[
    ("DC", "Check Box_2"),
    ("RPZ", "Check Box_2_1"),
    ("DCDA", "Check Box_2_4"),
    ("RPDA", "Check Box_2_5"),
    ("PVB", "Check Box_2_7"),
    ("SVB", "Check Box_2_8"),
    ("DCDA Type II", "Check Box_2_3"),
    ("RPDA Type II", "Check Box_2_6"),
];

/// Text field values and checkbox flags for the TCEQ test report form
///
/// Empty values are left out so they never blank a field.
pub fn tceq_fields(record: &BackflowRecord) -> (BTreeMap<String, String>, BTreeMap<String, bool>) {
    let device = &record.device;
    let test = &record.test;
    let technician = &record.technician;
    let company = &record.company;
    let city = &record.city_info;

    let text: &[(&str, &str)] = &[
        // Supplier and service location
        ("Text Field", city.pws_name.as_str()),
        ("Text Field_1", city.pws_id.as_str()),
        ("Text Field_2", city.pws_address.as_str()),
        ("Text Field_3", city.pws_contact.as_str()),
        ("Text Field_4", record.service_address.as_str()),
        ("Text Field_5", record.customer_name.as_str()),
        // Main assembly
        ("Text Field_6", device.manufacturer_main.as_str()),
        ("Text Field_6_1_2", device.model_main.as_str()),
        ("Text Field_6_1_2_5", device.size_main.as_str()),
        ("Text Field_6_1_2_5_1", device.serial_main.as_str()),
        // Bypass assembly
        ("Text Field_6_1", device.manufacturer_bypass.as_str()),
        ("Text Field_6_1_2_1", device.model_bypass.as_str()),
        ("Text Field_6_1_2_3", device.serial_bypass.as_str()),
        ("Text Field_6_1_1", device.bpa_location.as_str()),
        ("Text Field_6_1_2_2", device.bpa_serves.as_str()),
        ("Text Field_6_1_2_3_1", device.size_bypass.as_str()),
        ("Text Field_6_1_2_3_2", test.old_serial.as_str()),
        // Initial test
        ("Text Field_6_1_2_4_1", test.test_date_initial.as_str()),
        ("Text Field_6_1_2_4", test.test_time_initial.as_str()),
        ("Text Field_6_1_2_3_2_1", test.first_check_reading_initial.as_str()),
        ("Text Field_6_1_2_3_2_1_1", test.second_check_reading_initial.as_str()),
        ("Text Field_6_1_2_3_2_1_1_1", test.relief_valve_reading_initial.as_str()),
        (
            "Text Field_6_1_2_3_2_1_1_2",
            test.type_ii_bypass_check_reading_initial.as_str(),
        ),
        ("Text Field_6_1_2_3_2_1_1_2_1", test.air_inlet_reading_initial.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_3", test.check_valve_reading_initial.as_str()),
        // Repairs
        ("Text Field_6_1_2_3_2_1_1_2_10_1_5", test.repairs_main.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_5_1", test.repairs_bypass.as_str()),
        // After repair
        ("Text Field_6_1_2_3_2_1_1_2_4", test.first_check_reading_after_repair.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_5", test.second_check_reading_after_repair.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_6", test.relief_valve_reading_after_repair.as_str()),
        (
            "Text Field_6_1_2_3_2_1_1_2_7",
            test.type_ii_bypass_check_reading_after_repair.as_str(),
        ),
        ("Text Field_6_1_2_3_2_1_1_2_8", test.air_inlet_reading_after_repair.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_9", test.check_valve_reading_after_repair.as_str()),
        ("Text Field_6_1_2_4_1_1", test.test_date_after_repair.as_str()),
        ("Text Field_6_1_2_4_1_1_1", test.test_time_after_repair.as_str()),
        // Tester certification
        ("Text Field_6_1_2_3_2_1_1_2_10", company.name.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1", company.phone.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_1", test.test_date_initial.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_5_2", company.address.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_2", technician.bpat_license_number.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_3", technician.license_expiration_date.as_str()),
        ("Text Field_6_1_2_3_2_1_1_2_10_1_4", technician.name.as_str()),
    ];

    let field_values: BTreeMap<String, String> = text
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    let mut boxes: Vec<&str> = Vec::new();

    if let Some((_, name)) = DEVICE_TYPE_BOXES
        .iter()
        .find(|(kind, _)| *kind == device.type_main.as_str())
    {
        boxes.push(*name);
    }

    match test.reason_for_test.as_str() {
        "New" => boxes.push("Check Box"),
        "" | "Existing" => boxes.push("Check Box_1"),
        _ => {}
    }

    if test.installed_per_code.as_str() == "Yes" {
        boxes.push("Check Box_2_27");
    }
    if test.installed_on_non_potable_auxiliary.as_str() == "Yes" {
        boxes.push("Check Box_2_28");
    }

    boxes.push(if test.first_check_closed_tight_initial.as_str() == "Closed Tight" {
        "Check Box_2_11"
    } else {
        "Check Box_2_12"
    });
    boxes.push(if test.second_check_closed_tight_initial.as_str() == "Closed Tight" {
        "Check Box_2_9"
    } else {
        "Check Box_2_10"
    });

    if test.relief_valve_did_not_open_initial.as_str() == "Did not open" {
        boxes.push("Check Box_2_13");
    }
    if test.air_inlet_did_not_open_initial.as_str() == "Yes" {
        boxes.push("Check Box_2_14");
    }
    if test.check_valve_leaked_initial.as_str() == "No" {
        boxes.push("Check Box_2_15");
    }

    match test.first_check_closed_tight_after_repair.as_str() {
        "Closed Tight" => boxes.push("Check Box_2_16"),
        "Leaked" => boxes.push("Check Box_2_17"),
        _ => {}
    }
    match test.second_check_closed_tight_after_repair.as_str() {
        "Closed Tight" => boxes.push("Check Box_2_18"),
        "Leaked" => boxes.push("Check Box_2_19"),
        _ => {}
    }
    if test.type_ii_bypass_closed_tight_after_repair.as_str() == "Closed Tight" {
        boxes.push("Check Box_2_21");
    }

    boxes.push(if record.gauge_is_potable() {
        "Check Box_2_32"
    } else {
        "Check Box_2_33"
    });

    let checkbox_flags = boxes
        .into_iter()
        .map(|name| (name.to_string(), true))
        .collect();

    (field_values, checkbox_flags)
}

/// How a report was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStrategy {
    /// The TCEQ template's form fields were filled
    NamedFields,
    /// A reference sheet was rendered from scratch
    ReferenceSheet,
}

/// A generated report ready to upload or download
#[derive(Debug, Clone)]
pub struct BackflowReport {
    pub bytes: Vec<u8>,
    pub strategy: ReportStrategy,
    pub file_name: String,
}

/// Produce the test report for `record`
///
/// With a template, its form fields are filled by name; any failure there
/// falls back to the reference sheet. Without a template the reference
/// sheet is used directly. Only a failure to render the reference sheet
/// itself is returned as an error.
pub fn generate_backflow_report(
    template: Option<&[u8]>,
    record: &BackflowRecord,
) -> Result<BackflowReport> {
    let file_name = record.report_file_name();

    if let Some(template) = template {
        let (field_values, checkbox_flags) = tceq_fields(record);
        match fill_named_fields(template, &field_values, &checkbox_flags) {
            Ok(bytes) => {
                info!(file = %file_name, "filled test report template");
                return Ok(BackflowReport {
                    bytes,
                    strategy: ReportStrategy::NamedFields,
                    file_name,
                });
            }
            Err(err) => {
                warn!(error = %err, "template fill failed, falling back to reference sheet");
            }
        }
    }

    let bytes = render_reference_sheet(record)?;
    Ok(BackflowReport {
        bytes,
        strategy: ReportStrategy::ReferenceSheet,
        file_name,
    })
}
