//! Shared entity fixtures for compile and index tests.

use crate::{
    model::{ColumnType, EntityModel},
    value::Value,
};
use chrono::{DateTime, Utc};

pub(crate) struct Person {
    pub name: Option<String>,
    pub age: i32,
    pub active: bool,
    pub status: i32,
    pub grade: char,
    pub joined: Option<DateTime<Utc>>,
}

impl Person {
    pub fn sample() -> Self {
        Self {
            name: Some("ada".to_string()),
            age: 30,
            active: true,
            status: 1,
            grade: 'a',
            joined: DateTime::from_timestamp_millis(1_700_000_000_000),
        }
    }
}

/// `score` is declared but not indexable; selecting it must fail.
pub(crate) fn person_model() -> EntityModel<Person> {
    EntityModel::builder("person")
        .leaf("name", ColumnType::Text, |p: &Person| {
            Value::from(p.name.clone())
        })
        .leaf("age", ColumnType::Int32, |p: &Person| Value::from(p.age))
        .leaf("active", ColumnType::Bool, |p: &Person| {
            Value::from(p.active)
        })
        .leaf("status", ColumnType::Int32, |p: &Person| {
            Value::from(p.status)
        })
        .leaf("grade", ColumnType::Char, |p: &Person| Value::from(p.grade))
        .leaf("joined", ColumnType::Timestamp, |p: &Person| {
            Value::from(p.joined)
        })
        .leaf("score", ColumnType::Unsupported, |_| Value::Null)
        .build()
}

pub(crate) struct Address {
    pub city: String,
    pub zip: i32,
}

pub(crate) struct Contact {
    pub email: Option<String>,
}

pub(crate) struct Period {
    pub note: Option<String>,
    pub seq: i32,
}

pub(crate) struct Billing {
    pub period: Period,
}

pub(crate) struct Customer {
    pub id: i64,
    pub address: Option<Address>,
    pub contact: Contact,
    pub billing: Billing,
}

impl Customer {
    pub fn sample() -> Self {
        Self {
            id: 7,
            address: Some(Address {
                city: "harstad".to_string(),
                zip: 9400,
            }),
            contact: Contact {
                email: Some("ada@example.com".to_string()),
            },
            billing: Billing {
                period: Period {
                    note: Some("net30".to_string()),
                    seq: 2,
                },
            },
        }
    }
}

/// `address` is an optional sub-record, `contact` and the whole `billing`
/// chain are mandatory containers.
pub(crate) fn customer_model() -> EntityModel<Customer> {
    EntityModel::builder("customer")
        .leaf("id", ColumnType::Int64, |c: &Customer| Value::from(c.id))
        .nested(
            "address",
            true,
            |c: &Customer| {
                if c.address.is_some() {
                    Value::Unit
                } else {
                    Value::Null
                }
            },
            |address| {
                address
                    .leaf("city", ColumnType::Text, |c: &Customer| {
                        c.address
                            .as_ref()
                            .map_or(Value::Null, |a| Value::from(a.city.clone()))
                    })
                    .leaf("zip", ColumnType::Int32, |c: &Customer| {
                        c.address.as_ref().map_or(Value::Null, |a| Value::from(a.zip))
                    })
            },
        )
        .nested(
            "contact",
            false,
            |_| Value::Unit,
            |contact| {
                contact.leaf("email", ColumnType::Text, |c: &Customer| {
                    Value::from(c.contact.email.clone())
                })
            },
        )
        .nested(
            "billing",
            false,
            |_| Value::Unit,
            |billing| {
                billing.nested(
                    "period",
                    false,
                    |_| Value::Unit,
                    |period| {
                        period
                            .leaf("note", ColumnType::Text, |c: &Customer| {
                                Value::from(c.billing.period.note.clone())
                            })
                            .leaf("seq", ColumnType::Int32, |c: &Customer| {
                                Value::from(c.billing.period.seq)
                            })
                    },
                )
            },
        )
        .build()
}
