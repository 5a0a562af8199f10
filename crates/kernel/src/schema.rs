//! Declarative collection schemas.
//!
//! A [`CollectionSchema`] lists the fields a collection expects, their BSON
//! type, and whether they must be present. The same declaration is turned
//! into a MongoDB `$jsonSchema` validator and checked directly by the
//! in-memory store, so both backends reject the same writes.

use std::fmt;

use bson::{doc, Bson, Document};

/// Field holding the insertion instant on timestamped collections.
pub const CREATED_AT: &str = "createdAt";
/// Field holding the last-write instant on timestamped collections.
pub const UPDATED_AT: &str = "updatedAt";

/// Primitive BSON type a field is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    ObjectId,
    DateTime,
}

impl FieldKind {
    /// Type alias understood by `$jsonSchema`'s `bsonType` keyword.
    pub const fn bson_type(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::ObjectId => "objectId",
            FieldKind::DateTime => "date",
        }
    }

    fn accepts(self, value: &Bson) -> bool {
        matches!(
            (self, value),
            (FieldKind::String, Bson::String(_))
                | (FieldKind::ObjectId, Bson::ObjectId(_))
                | (FieldKind::DateTime, Bson::DateTime(_))
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bson_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Required string fields must also be non-empty.
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    fn check(&self, value: Option<&Bson>) -> Option<FieldViolation> {
        let violation = match value {
            None | Some(Bson::Null) if self.required => Violation::Missing,
            None | Some(Bson::Null) => return None,
            Some(value) if !self.kind.accepts(value) => Violation::WrongType {
                expected: self.kind,
            },
            Some(Bson::String(text)) if self.required && text.is_empty() => Violation::Empty,
            Some(_) => return None,
        };
        Some(FieldViolation::new(self.name, violation))
    }
}

fn into_result(violations: Vec<FieldViolation>) -> Result<(), Vec<FieldViolation>> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

static TIMESTAMP_FIELDS: [FieldSpec; 2] = [
    FieldSpec::optional(CREATED_AT, FieldKind::DateTime),
    FieldSpec::optional(UPDATED_AT, FieldKind::DateTime),
];

/// Field list and options for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub collection: &'static str,
    pub fields: &'static [FieldSpec],
    /// Whether writes carry `createdAt` / `updatedAt`.
    pub timestamps: bool,
}

impl CollectionSchema {
    /// Declared fields plus the timestamp pair when enabled.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        let timestamps: &[FieldSpec] = if self.timestamps {
            &TIMESTAMP_FIELDS
        } else {
            &[]
        };
        self.fields.iter().chain(timestamps.iter())
    }

    /// Check a whole document against the declaration.
    ///
    /// Undeclared fields are accepted. `null` counts as absent.
    pub fn validate(&self, document: &Document) -> Result<(), Vec<FieldViolation>> {
        let violations = self
            .all_fields()
            .filter_map(|spec| spec.check(document.get(spec.name)))
            .collect();
        into_result(violations)
    }

    /// Check only the declared fields present in `fields`, as for a `$set`.
    /// Setting a required field to `null` counts as removing it.
    pub fn validate_fields(&self, fields: &Document) -> Result<(), Vec<FieldViolation>> {
        let violations = self
            .all_fields()
            .filter_map(|spec| fields.get(spec.name).and_then(|value| spec.check(Some(value))))
            .collect();
        into_result(violations)
    }

    /// Collection validator in MongoDB's `$jsonSchema` dialect.
    pub fn json_schema(&self) -> Document {
        let mut properties = Document::new();
        let mut required = Vec::new();

        for spec in self.all_fields() {
            let mut property = if spec.required {
                required.push(Bson::String(spec.name.to_string()));
                doc! { "bsonType": spec.kind.bson_type() }
            } else {
                doc! { "bsonType": [spec.kind.bson_type(), "null"] }
            };
            if spec.required && spec.kind == FieldKind::String {
                property.insert("minLength", 1);
            }
            properties.insert(spec.name, property);
        }

        let mut schema = doc! { "bsonType": "object" };
        // `$jsonSchema` rejects an empty `required` array.
        if !required.is_empty() {
            schema.insert("required", required);
        }
        schema.insert("properties", properties);

        doc! { "$jsonSchema": schema }
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Missing,
    Empty,
    WrongType { expected: FieldKind },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub violation: Violation,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self {
            field: field.into(),
            violation,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.violation {
            Violation::Missing => write!(f, "path `{}` is required", self.field),
            Violation::Empty => write!(f, "path `{}` must not be empty", self.field),
            Violation::WrongType { expected } => {
                write!(f, "path `{}` must be of type {}", self.field, expected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;

    static NOTES: CollectionSchema = CollectionSchema {
        collection: "notes",
        fields: &[
            FieldSpec::required("body", FieldKind::String),
            FieldSpec::optional("owner_id", FieldKind::ObjectId),
        ],
        timestamps: true,
    };

    static TAGS: CollectionSchema = CollectionSchema {
        collection: "tags",
        fields: &[FieldSpec::optional("label", FieldKind::String)],
        timestamps: false,
    };

    #[test]
    fn valid_document_passes() {
        let document = doc! {
            "body": "hello",
            "owner_id": ObjectId::new(),
            "createdAt": bson::DateTime::now(),
            "extra": 42,
        };
        assert!(NOTES.validate(&document).is_ok());
    }

    #[test]
    fn missing_and_empty_required_fields_are_reported() {
        let missing = NOTES.validate(&doc! {}).unwrap_err();
        assert_eq!(missing, vec![FieldViolation::new("body", Violation::Missing)]);

        let empty = NOTES.validate(&doc! { "body": "" }).unwrap_err();
        assert_eq!(empty, vec![FieldViolation::new("body", Violation::Empty)]);

        let null = NOTES.validate(&doc! { "body": Bson::Null }).unwrap_err();
        assert_eq!(null[0].violation, Violation::Missing);
    }

    #[test]
    fn wrong_types_are_reported() {
        let violations = NOTES
            .validate(&doc! { "body": 7, "owner_id": "not-an-id", "updatedAt": "yesterday" })
            .unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["body", "owner_id", "updatedAt"]);
        assert_eq!(
            violations[1].to_string(),
            "path `owner_id` must be of type objectId"
        );
    }

    #[test]
    fn optional_null_is_accepted() {
        assert!(NOTES
            .validate(&doc! { "body": "x", "owner_id": Bson::Null })
            .is_ok());
    }

    #[test]
    fn timestamp_fields_only_when_enabled() {
        let stamped = NOTES
            .validate(&doc! { "body": "x", "createdAt": "whenever" })
            .unwrap_err();
        assert_eq!(stamped[0].field, CREATED_AT);
        assert!(TAGS.validate(&doc! { "createdAt": "whenever" }).is_ok());
    }

    #[test]
    fn json_schema_lists_required_fields_with_min_length() {
        let validator = NOTES.json_schema();
        let schema = validator.get_document("$jsonSchema").unwrap();

        let required = schema.get_array("required").unwrap();
        assert_eq!(required, &vec![Bson::String("body".to_string())]);

        let properties = schema.get_document("properties").unwrap();
        let body = properties.get_document("body").unwrap();
        assert_eq!(body.get_str("bsonType").unwrap(), "string");
        assert_eq!(body.get_i32("minLength").unwrap(), 1);

        let owner = properties.get_document("owner_id").unwrap();
        assert_eq!(
            owner.get_array("bsonType").unwrap(),
            &vec![Bson::from("objectId"), Bson::from("null")]
        );
        assert!(properties.contains_key(UPDATED_AT));
    }

    #[test]
    fn json_schema_omits_empty_required() {
        let validator = TAGS.json_schema();
        let schema = validator.get_document("$jsonSchema").unwrap();
        assert!(!schema.contains_key("required"));
    }

    #[test]
    fn validate_fields_checks_only_present_fields() {
        assert!(NOTES.validate_fields(&doc! {}).is_ok());
        assert!(NOTES.validate_fields(&doc! { "extra": 1 }).is_ok());
        assert!(NOTES
            .validate_fields(&doc! { "owner_id": Bson::Null })
            .is_ok());

        let empty = NOTES.validate_fields(&doc! { "body": "" }).unwrap_err();
        assert_eq!(empty, vec![FieldViolation::new("body", Violation::Empty)]);

        let cleared = NOTES
            .validate_fields(&doc! { "body": Bson::Null })
            .unwrap_err();
        assert_eq!(cleared, vec![FieldViolation::new("body", Violation::Missing)]);
    }
}
