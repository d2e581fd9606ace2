//! Object schema modeling for SOQL to SQL conversion and DML

use std::collections::HashMap;

/// Schema of every object the store knows about
#[derive(Debug, Clone, Default)]
pub struct SalesforceSchema {
    /// Keyed by lowercased API name
    objects: HashMap<String, SObjectDescribe>,
}

impl SalesforceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: SObjectDescribe) {
        self.objects.insert(object.name.to_lowercase(), object);
    }

    /// Look up an object, ignoring case
    pub fn get_object(&self, name: &str) -> Option<&SObjectDescribe> {
        self.objects.get(&name.to_lowercase())
    }

    /// Find the object that owns a 3-character id prefix
    pub fn object_for_key_prefix(&self, prefix: &str) -> Option<&SObjectDescribe> {
        self.objects.values().find(|o| o.key_prefix == prefix)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SObjectDescribe> {
        self.objects.values()
    }

    pub fn has_object(&self, name: &str) -> bool {
        self.objects.contains_key(&name.to_lowercase())
    }
}

/// One storable object: its API name, table and id prefix, and fields
#[derive(Debug, Clone)]
pub struct SObjectDescribe {
    /// API name (e.g., "Account")
    pub name: String,
    /// SQL table name (snake_case: "account")
    pub table_name: String,
    /// 3-character prefix of every id of this object (e.g., "001")
    pub key_prefix: String,
    /// Fields in declaration order
    fields: Vec<FieldDescribe>,
}

impl SObjectDescribe {
    /// Table name defaults to the snake_case API name
    pub fn new(name: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        let name = name.into();
        let table_name = to_snake_case(&name);
        Self {
            name,
            table_name,
            key_prefix: key_prefix.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, replacing any field with the same name
    pub fn add_field(&mut self, field: FieldDescribe) {
        self.fields.retain(|f| !f.name.eq_ignore_ascii_case(&field.name));
        self.fields.push(field);
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescribe> {
        self.fields.iter()
    }

    /// Fields that must be set on insert (Id is assigned by the store)
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescribe> {
        self.fields
            .iter()
            .filter(|f| !f.nillable && f.field_type != SalesforceFieldType::Id)
    }

    /// Find the lookup field whose relationship name is `relationship_name`
    pub fn get_relationship(&self, relationship_name: &str) -> Option<&FieldDescribe> {
        self.fields.iter().find(|f| {
            f.relationship_name
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(relationship_name))
        })
    }
}

/// One field of an object and the column backing it
#[derive(Debug, Clone)]
pub struct FieldDescribe {
    /// API name (e.g., "AccountId")
    pub name: String,
    /// SQL column name (snake_case)
    pub column_name: String,
    pub field_type: SalesforceFieldType,
    /// For lookup fields: the referenced object
    pub reference_to: Option<String>,
    /// Name used in SOQL paths, "Account" for AccountId
    pub relationship_name: Option<String>,
    pub nillable: bool,
    /// Delete this record when the referenced parent is deleted
    pub cascade_delete: bool,
}

impl FieldDescribe {
    pub fn new(name: impl Into<String>, field_type: SalesforceFieldType) -> Self {
        let name = name.into();
        let column_name = to_snake_case(&name);
        Self {
            name,
            column_name,
            field_type,
            reference_to: None,
            relationship_name: None,
            nillable: true,
            cascade_delete: false,
        }
    }

    /// Make this a lookup to `reference_to`
    pub fn with_reference(mut self, reference_to: impl Into<String>) -> Self {
        self.reference_to = Some(reference_to.into());
        self
    }

    pub fn with_relationship_name(mut self, name: impl Into<String>) -> Self {
        self.relationship_name = Some(name.into());
        self
    }

    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Delete with the parent
    pub fn with_cascade_delete(mut self) -> Self {
        self.cascade_delete = true;
        self
    }

    pub fn is_relationship(&self) -> bool {
        self.reference_to.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesforceFieldType {
    Id,
    String,
    TextArea,
    Boolean,
    Integer,
    Double,
    Currency,
    Percent,
    Date,
    Picklist,
    Lookup,
}

/// SQL spelling of an API name: "AccountId" -> "account_id", "HTTPServer" -> "http_server"
pub(crate) fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut snake = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let word_start = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if word_start {
                snake.push('_');
            }
        }
        snake.extend(c.to_lowercase());
    }

    snake
}
