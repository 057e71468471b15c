//! Service API for reading typed configuration properties

use crate::coerce::{FromProperty, PropertyKind, PropertyValue};
use crate::{Error, Result};

/// Access to some scope of configuration properties.
///
/// Property values are stored as strings and interpreted according to the
/// kind the caller asks for.
pub trait ConfigurationProperties: Send + Sync {
    /// Read property `name` as `kind`.
    ///
    /// Returns `Ok(None)` when the property is not defined.
    ///
    /// # Errors
    ///
    /// Fails when the value cannot be converted, when `kind` has no
    /// conversion rule, or when the underlying store is not readable.
    fn property_value(&self, name: &str, kind: PropertyKind) -> Result<Option<PropertyValue>>;
}

/// Typed accessors for every [`ConfigurationProperties`] implementation.
pub trait ConfigurationPropertiesExt: ConfigurationProperties {
    /// Strict accessor: conversion failures propagate.
    fn get<T: FromProperty>(&self, name: &str) -> Result<Option<T>> {
        match self.property_value(name, T::KIND)? {
            None => Ok(None),
            Some(value) => {
                let kind = value.kind();
                T::from_value(value).map(Some).ok_or(Error::UnsupportedType { kind })
            }
        }
    }

    /// Defaulting accessor: never fails.
    ///
    /// An undefined property, or any error while reading it, yields `default`.
    fn get_or<T: FromProperty>(&self, name: &str, default: T) -> T {
        match self.get::<T>(name) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(property = name, error = %e, "Failed processing property value, returning default");
                default
            }
        }
    }

    /// Kind-based form of [`ConfigurationPropertiesExt::get_or`].
    fn get_value_or(&self, name: &str, kind: PropertyKind, default: PropertyValue) -> PropertyValue {
        match self.property_value(name, kind) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(property = name, %kind, error = %e, "Failed processing property value, returning default");
                default
            }
        }
    }
}

impl<C: ConfigurationProperties + ?Sized> ConfigurationPropertiesExt for C {}
