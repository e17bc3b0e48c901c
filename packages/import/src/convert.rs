//! CSV row → database event conversion.
//!
//! Each event type maps to a tagged [`EventPayload`] variant carrying
//! only the fields that are legal for it, so field legality is enforced
//! when the payload is constructed rather than by presence checks at
//! serialization time. Lifecycle snapshots carry the full attribute set;
//! update events carry exactly the one `new_*` value they change.

use av_map_events::{EventRecord, EventType, aggregate_id, is_inline_coordinates};
use serde::Serialize;
use serde_json::{Map, Value};

/// Errors converting a single CSV row.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Every imported event needs company, city, and date to form its
    /// aggregate identifier.
    #[error("Row {row}: missing required fields: company, city, or event_date")]
    MissingIdentity {
        /// 1-based CSV row number.
        row: usize,
    },

    /// The row's event type is not in the enumeration.
    #[error("Row {row}: unknown event type: {value}")]
    UnknownEventType {
        /// 1-based CSV row number.
        row: usize,
        /// The unrecognized value.
        value: String,
    },
}

/// Service attribute snapshot, under database field names. Used by the
/// lifecycle events that describe the whole service at a point in time.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ServiceAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_types: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fares: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_booking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supervision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fleet_partner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_platform_link: Option<String>,
}

/// Fields legal on every event type.
#[derive(Debug, Default, Clone)]
pub struct EventContext {
    /// City, stored as `name` in the event data.
    pub name: String,
    pub company: String,
    pub notes: Option<String>,
    pub event_url: Option<String>,
    pub expected_launch: Option<String>,
    pub geometry_name: Option<String>,
}

/// Event-type-specific portion of the event data.
#[derive(Debug, Clone)]
pub enum EventPayload {
    /// Full service snapshot at creation.
    Created(ServiceAttributes),
    /// Service entered public testing.
    Testing(ServiceAttributes),
    /// Service announced ahead of launch.
    Announced(ServiceAttributes),
    /// Service wound down; identity and context only.
    Ended,
    /// Operating boundary changed; the new boundary is the context's
    /// `geometry_name`.
    GeometryUpdated,
    /// Exactly one service attribute changed.
    AttributeChanged {
        /// Database field name of the changed attribute.
        field: &'static str,
        /// The new value, absent when the source cell was blank.
        new_value: Option<String>,
    },
}

/// One row in the database events table.
#[derive(Debug, Clone, Serialize)]
pub struct DbEvent {
    pub aggregate_id: String,
    pub aggregate_type: &'static str,
    pub event_date: String,
    pub event_type: String,
    pub event_data: Value,
}

/// Maps a CSV attribute column to its database field name.
fn db_attribute_name(csv_column: &'static str) -> &'static str {
    match csv_column {
        "vehicles" => "vehicle_types",
        _ => csv_column,
    }
}

/// Converts one CSV record into its database event shape.
///
/// # Errors
///
/// Returns [`ConvertError`] if the row lacks company, city, or date, or
/// carries an unknown event type. Callers abort the whole import on the
/// first error.
pub fn to_db_event(record: &EventRecord) -> Result<DbEvent, ConvertError> {
    let row = record.row_num;
    let company = record.get("company");
    let city = record.get("city");
    let date = record.get("event_date");

    if company.is_empty() || city.is_empty() || date.is_empty() {
        return Err(ConvertError::MissingIdentity { row });
    }

    let event_type = record
        .event_type()
        .ok_or_else(|| ConvertError::UnknownEventType {
            row,
            value: record.get("event_type").to_string(),
        })?;

    let context = EventContext {
        name: city.to_string(),
        company: company.to_string(),
        notes: non_empty(record, "notes"),
        event_url: non_empty(record, "source_url"),
        expected_launch: non_empty(record, "expected_launch"),
        geometry_name: geometry_name(record.get("geometry_file")),
    };

    let payload = match event_type {
        EventType::ServiceCreated => EventPayload::Created(attributes(record)),
        EventType::ServiceTesting => EventPayload::Testing(attributes(record)),
        EventType::ServiceAnnounced => EventPayload::Announced(attributes(record)),
        EventType::ServiceEnded => EventPayload::Ended,
        EventType::GeometryUpdated => EventPayload::GeometryUpdated,
        update => {
            let csv_column = update
                .updated_column()
                .unwrap_or_else(|| unreachable!("update events always map to a column"));
            EventPayload::AttributeChanged {
                field: db_attribute_name(csv_column),
                new_value: non_empty(record, csv_column),
            }
        }
    };

    Ok(DbEvent {
        aggregate_id: aggregate_id(company, city),
        aggregate_type: "service_area",
        event_date: date.to_string(),
        event_type: event_type.to_string(),
        event_data: event_data(&context, &payload),
    })
}

/// Builds the `event_data` JSON object from context + payload.
fn event_data(context: &EventContext, payload: &EventPayload) -> Value {
    let mut data = Map::new();
    data.insert("name".to_string(), Value::String(context.name.clone()));
    data.insert(
        "company".to_string(),
        Value::String(context.company.clone()),
    );
    insert_opt(&mut data, "notes", context.notes.as_ref());
    insert_opt(&mut data, "event_url", context.event_url.as_ref());
    insert_opt(
        &mut data,
        "expected_launch",
        context.expected_launch.as_ref(),
    );
    insert_opt(&mut data, "geometry_name", context.geometry_name.as_ref());

    match payload {
        EventPayload::Created(attrs)
        | EventPayload::Testing(attrs)
        | EventPayload::Announced(attrs) => {
            if let Ok(Value::Object(fields)) = serde_json::to_value(attrs) {
                data.extend(fields);
            }
        }
        EventPayload::Ended | EventPayload::GeometryUpdated => {}
        EventPayload::AttributeChanged { field, new_value } => {
            if let Some(value) = new_value {
                data.insert(format!("new_{field}"), Value::String(value.clone()));
            }
        }
    }

    Value::Object(data)
}

fn insert_opt(data: &mut Map<String, Value>, key: &str, value: Option<&String>) {
    if let Some(value) = value {
        data.insert(key.to_string(), Value::String(value.clone()));
    }
}

fn non_empty(record: &EventRecord, column: &str) -> Option<String> {
    let value = record.get(column);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Converts a `geometry_file` value to the stored `geometry_name`:
/// inline coordinates pass through verbatim, filenames lose their
/// `.geojson` extension, blanks disappear.
fn geometry_name(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else if is_inline_coordinates(value) {
        Some(value.to_string())
    } else {
        Some(value.trim_end_matches(".geojson").to_string())
    }
}

/// Reads the full attribute snapshot for lifecycle events.
fn attributes(record: &EventRecord) -> ServiceAttributes {
    ServiceAttributes {
        vehicle_types: non_empty(record, "vehicles"),
        platform: non_empty(record, "platform"),
        fares: non_empty(record, "fares"),
        direct_booking: non_empty(record, "direct_booking"),
        service_model: non_empty(record, "service_model"),
        supervision: non_empty(record, "supervision"),
        access: non_empty(record, "access"),
        fleet_partner: non_empty(record, "fleet_partner"),
        company_link: non_empty(record, "company_link"),
        booking_platform_link: non_empty(record, "booking_platform_link"),
    }
}
