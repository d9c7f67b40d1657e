//! Typed accessor table for the tracked properties of [`UserEntity`].
//!
//! Every property is enumerated once with a reader and, where the property
//! is writable, a mutator. Names are the persisted (legacy) property names
//! and appear verbatim in diffs and change-request payloads.

use chrono::{DateTime, Utc};

use memberkit_core::DomainError;

use crate::user::{GroupRef, UserEntity};

/// Value read from a property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Groups(Vec<GroupRef>),
}

impl PropertyValue {
    /// Composite values are compared by a type-specific rule instead of `==`.
    pub fn is_composite(&self) -> bool {
        matches!(self, PropertyValue::Timestamp(_) | PropertyValue::Groups(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Null => "null",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::Text(_) => "text",
            PropertyValue::Timestamp(_) => "timestamp",
            PropertyValue::Groups(_) => "groups",
        }
    }
}

macro_rules! properties {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A tracked property of [`UserEntity`].
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum Property {
            $($variant),+
        }

        impl Property {
            /// All properties, in detection order.
            pub const ALL: &'static [Property] = &[$(Property::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $(Property::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<Property> {
                match name {
                    $($name => Some(Property::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

properties! {
    Username => "username",
    Password => "password",
    Usergroup => "usergroup",
    Name => "name",
    FirstName => "firstName",
    MiddleName => "middleName",
    LastName => "lastName",
    Address => "address",
    Telephone => "telephone",
    Fax => "fax",
    Email => "email",
    Title => "title",
    Zip => "zip",
    City => "city",
    Country => "country",
    Www => "www",
    Company => "company",
    DateOfBirth => "dateOfBirth",
    Gender => "gender",
    Terms => "terms",
    Disable => "disable",
    ChangeRequest => "txFemanagerChangerequest",
    IgnoreDirty => "ignoreDirty",
    IsOnline => "isOnline",
    LastLogin => "lastlogin",
}

impl core::fmt::Display for Property {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

fn text(value: &str) -> PropertyValue {
    PropertyValue::Text(value.to_string())
}

fn timestamp(value: Option<DateTime<Utc>>) -> PropertyValue {
    value.map_or(PropertyValue::Null, PropertyValue::Timestamp)
}

impl Property {
    /// Read the property from `user`.
    pub fn read(&self, user: &UserEntity) -> PropertyValue {
        match self {
            Property::Username => text(&user.username),
            Property::Password => text(&user.password),
            Property::Usergroup => PropertyValue::Groups(user.usergroups().to_vec()),
            Property::Name => text(&user.name),
            Property::FirstName => text(&user.first_name),
            Property::MiddleName => text(&user.middle_name),
            Property::LastName => text(&user.last_name),
            Property::Address => text(&user.address),
            Property::Telephone => text(&user.telephone),
            Property::Fax => text(&user.fax),
            Property::Email => text(&user.email),
            Property::Title => text(&user.title),
            Property::Zip => text(&user.zip),
            Property::City => text(&user.city),
            Property::Country => text(&user.country),
            Property::Www => text(&user.www),
            Property::Company => text(&user.company),
            Property::DateOfBirth => timestamp(user.date_of_birth),
            Property::Gender => PropertyValue::Int(user.gender),
            Property::Terms => PropertyValue::Bool(user.terms),
            Property::Disable => PropertyValue::Bool(user.disable),
            Property::ChangeRequest => user
                .change_request
                .as_deref()
                .map_or(PropertyValue::Null, text),
            Property::IgnoreDirty => PropertyValue::Bool(user.ignore_dirty),
            Property::IsOnline => PropertyValue::Bool(user.is_online),
            Property::LastLogin => timestamp(user.last_login),
        }
    }

    /// Whether the property can be written through [`Property::write`].
    ///
    /// Session-maintained properties are read-only.
    pub fn is_writable(&self) -> bool {
        !matches!(self, Property::IsOnline | Property::LastLogin)
    }

    /// Write `value` to the property on `user`.
    ///
    /// Fails when the property has no mutator or the value has the wrong type.
    pub fn write(&self, user: &mut UserEntity, value: PropertyValue) -> Result<(), DomainError> {
        if !self.is_writable() {
            return Err(DomainError::contract(format!(
                "property '{self}' has no mutator"
            )));
        }

        let mismatch = |value: &PropertyValue| {
            DomainError::contract(format!(
                "property '{self}' cannot be set from a {} value",
                value.kind()
            ))
        };

        match (self, value) {
            (Property::Usergroup, PropertyValue::Groups(groups)) => user.set_usergroups(groups),
            (Property::DateOfBirth, PropertyValue::Timestamp(t)) => user.date_of_birth = Some(t),
            (Property::DateOfBirth, PropertyValue::Null) => user.date_of_birth = None,
            (Property::Gender, PropertyValue::Int(v)) => user.gender = v,
            (Property::Terms, PropertyValue::Bool(v)) => user.terms = v,
            (Property::Disable, PropertyValue::Bool(v)) => user.disable = v,
            (Property::IgnoreDirty, PropertyValue::Bool(v)) => user.ignore_dirty = v,
            (Property::ChangeRequest, PropertyValue::Null) => user.change_request = None,
            (Property::ChangeRequest, PropertyValue::Text(v)) => user.change_request = Some(v),
            (property, PropertyValue::Text(v)) => match property.text_field(user) {
                Some(field) => *field = v,
                None => return Err(mismatch(&PropertyValue::Text(v))),
            },
            (_, other) => return Err(mismatch(&other)),
        }
        Ok(())
    }

    fn text_field<'a>(&self, user: &'a mut UserEntity) -> Option<&'a mut String> {
        let field = match self {
            Property::Username => &mut user.username,
            Property::Password => &mut user.password,
            Property::Name => &mut user.name,
            Property::FirstName => &mut user.first_name,
            Property::MiddleName => &mut user.middle_name,
            Property::LastName => &mut user.last_name,
            Property::Address => &mut user.address,
            Property::Telephone => &mut user.telephone,
            Property::Fax => &mut user.fax,
            Property::Email => &mut user.email,
            Property::Title => &mut user.title,
            Property::Zip => &mut user.zip,
            Property::City => &mut user.city,
            Property::Country => &mut user.country,
            Property::Www => &mut user.www,
            Property::Company => &mut user.company,
            _ => return None,
        };
        Some(field)
    }
}
