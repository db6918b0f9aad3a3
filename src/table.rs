//! Named field lists that encode to binary OpenType structures.
//!
//! A [`Table`] is an ordered list of fields. Scalars and [`Record`]s are written in place. Each
//! nested `Table` is written after the head of its parent and referenced from the head by a
//! 16-bit offset measured from the start of the parent, so every table can be encoded without
//! knowing where it will end up in the font.

use std::convert::TryFrom;

use log::debug;
use rustc_hash::FxHashMap;

use crate::binary::write::{WriteBinary, WriteBuffer, WriteContext, WriteCounter};
use crate::binary::U16Be;
use crate::error::WriteError;
use crate::types::{FieldType, Scalar};

/// A named binary structure whose nested tables are reached through offsets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    name: String,
    fields: Vec<Field>,
}

/// A named binary structure that is always written inline.
///
/// Records only hold scalars, so they can never introduce an offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    name: String,
    fields: Vec<(String, Scalar)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Scalar(Scalar),
    Table(Table),
    Record(Record),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Replacement values for scalar fields, applied by [`Table::with_overrides`].
#[derive(Clone, Debug, Default)]
pub struct FieldOverrides {
    values: FxHashMap<String, Scalar>,
}

impl Field {
    pub fn scalar(name: impl Into<String>, value: Scalar) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::Scalar(value),
        }
    }

    pub fn ushort(name: impl Into<String>, value: u16) -> Field {
        Field::scalar(name, Scalar::UShort(value))
    }

    pub fn tag(name: impl Into<String>, value: u32) -> Field {
        Field::scalar(name, Scalar::Tag(value))
    }

    pub fn table(name: impl Into<String>, table: Table) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::Table(table),
        }
    }

    pub fn record(name: impl Into<String>, record: Record) -> Field {
        Field {
            name: name.into(),
            value: FieldValue::Record(record),
        }
    }

    /// The wire type of this field. Inline records have no single type and return `None`.
    pub fn field_type(&self) -> Option<FieldType> {
        match &self.value {
            FieldValue::Scalar(scalar) => Some(scalar.field_type()),
            FieldValue::Table(_) => Some(FieldType::Table),
            FieldValue::Record(_) => None,
        }
    }
}

impl FieldOverrides {
    pub fn new() -> Self {
        FieldOverrides::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Scalar) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Table {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Table {
        Table {
            name: name.into(),
            fields,
        }
    }

    /// Construct a table, replacing the values of scalar fields named in `overrides`.
    ///
    /// Only fields that are already present are replaced; other names in `overrides` are
    /// ignored. An override must have the same type as the field it replaces.
    pub fn with_overrides(
        name: impl Into<String>,
        mut fields: Vec<Field>,
        overrides: &FieldOverrides,
    ) -> Result<Table, WriteError> {
        let name = name.into();
        for (key, value) in &overrides.values {
            let field = match fields.iter_mut().find(|field| &field.name == key) {
                Some(field) => field,
                None => {
                    debug!("ignoring override for unknown field '{}' of {}", key, name);
                    continue;
                }
            };
            match &mut field.value {
                FieldValue::Scalar(current) if current.field_type() == value.field_type() => {
                    *current = value.clone();
                }
                _ => return Err(WriteError::FieldTypeMismatch(key.clone())),
            }
        }

        Ok(Table { name, fields })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WriteError> {
        let mut buffer = WriteBuffer::new();
        Table::write(&mut buffer, self)?;
        Ok(buffer.into_inner())
    }

    /// The number of bytes `encode` produces, computed without building them.
    pub fn size_of(&self) -> Result<usize, WriteError> {
        let mut counter = WriteCounter::new();
        Table::write(&mut counter, self)?;
        Ok(counter.bytes_written())
    }
}

impl Record {
    pub fn new(name: impl Into<String>, fields: Vec<(String, Scalar)>) -> Record {
        Record {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, Scalar)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value)
    }

    pub fn encode(&self) -> Result<Vec<u8>, WriteError> {
        let mut buffer = WriteBuffer::new();
        Record::write(&mut buffer, self)?;
        Ok(buffer.into_inner())
    }

    pub fn size_of(&self) -> usize {
        self.fields.iter().map(|(_, value)| value.size()).sum()
    }
}

impl WriteBinary<&Self> for Table {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, table: &Table) -> Result<(), WriteError> {
        let start = ctxt.bytes_written();
        let mut subtables = Vec::new();

        for field in &table.fields {
            match &field.value {
                FieldValue::Scalar(scalar) => Scalar::write(ctxt, scalar)?,
                FieldValue::Record(record) => Record::write(ctxt, record)?,
                FieldValue::Table(subtable) => {
                    let placeholder = ctxt.placeholder::<U16Be, u16>()?;
                    subtables.push((placeholder, subtable));
                }
            }
        }

        for (placeholder, subtable) in subtables {
            let offset = u16::try_from(ctxt.bytes_written() - start)
                .map_err(|_| WriteError::OffsetOverflow(table.name.clone()))?;
            ctxt.write_placeholder(placeholder, offset)?;
            Table::write(ctxt, subtable)?;
        }

        Ok(())
    }
}

impl WriteBinary<&Self> for Record {
    type Output = ();

    fn write<C: WriteContext>(ctxt: &mut C, record: &Record) -> Result<(), WriteError> {
        for (_, value) in &record.fields {
            Scalar::write(ctxt, value)?;
        }
        Ok(())
    }
}

fn list_count(len: usize) -> Result<u16, WriteError> {
    u16::try_from(len).map_err(|_| WriteError::BadValue)
}

/// A `{name}Count` field followed by one USHORT field `{name}{i}` per element of `list`.
///
/// `count` defaults to the length of `list`.
pub fn ushort_list(name: &str, list: &[u16], count: Option<u16>) -> Result<Vec<Field>, WriteError> {
    let count = match count {
        Some(count) => count,
        None => list_count(list.len())?,
    };
    let mut fields = Vec::with_capacity(list.len() + 1);
    fields.push(Field::ushort(format!("{}Count", name), count));
    fields.extend(
        list.iter()
            .enumerate()
            .map(|(i, &value)| Field::ushort(format!("{}{}", name, i), value)),
    );
    Ok(fields)
}

/// A `{name}Count` field followed by one TABLE field `{name}{i}` per record, built by `cb`.
pub fn table_list<T, E, F>(name: &str, records: &[T], mut cb: F) -> Result<Vec<Field>, E>
where
    F: FnMut(&T, usize) -> Result<Table, E>,
    E: From<WriteError>,
{
    let mut fields = Vec::with_capacity(records.len() + 1);
    fields.push(Field::ushort(format!("{}Count", name), list_count(records.len())?));
    for (i, record) in records.iter().enumerate() {
        fields.push(Field::table(format!("{}{}", name, i), cb(record, i)?));
    }
    Ok(fields)
}

/// A `{name}Count` field followed by the fields `cb` produces for each record, inline.
pub fn record_list<T, E, F>(name: &str, records: &[T], mut cb: F) -> Result<Vec<Field>, E>
where
    F: FnMut(&T, usize) -> Result<Vec<Field>, E>,
    E: From<WriteError>,
{
    let mut fields = vec![Field::ushort(
        format!("{}Count", name),
        list_count(records.len())?,
    )];
    for (i, record) in records.iter().enumerate() {
        fields.extend(cb(record, i)?);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag;

    fn leaf(name: &str, value: u16) -> Table {
        Table::new(name, vec![Field::ushort("value", value)])
    }

    #[test]
    fn test_nested_offsets_are_relative_to_parent() {
        let inner = Table::new(
            "inner",
            vec![
                Field::ushort("x", 0xAAAA),
                Field::table("grandchild", leaf("leaf", 0xBBBB)),
            ],
        );
        let outer = Table::new(
            "outer",
            vec![
                Field::ushort("a", 1),
                Field::table("child", inner),
                Field::ushort("b", 2),
                Field::table(
                    "child2",
                    Table::new("leaf2", vec![Field::scalar("z", Scalar::Byte(0xCC))]),
                ),
            ],
        );

        let expected = [
            0x00, 0x01, // a
            0x00, 0x08, // offset to inner
            0x00, 0x02, // b
            0x00, 0x0E, // offset to leaf2
            0xAA, 0xAA, // inner.x
            0x00, 0x04, // offset from inner to leaf
            0xBB, 0xBB, // leaf.value
            0xCC, // leaf2.z
        ];
        assert_eq!(outer.encode().unwrap(), expected);
        assert_eq!(outer.size_of().unwrap(), expected.len());
    }

    #[test]
    fn test_records_are_inlined() {
        let record = Record::new(
            "tableRecord",
            vec![
                (String::from("tag"), Scalar::Tag(tag::GSUB)),
                (String::from("offset"), Scalar::ULong(12)),
            ],
        );
        let table = Table::new(
            "directory",
            vec![
                Field::ushort("numTables", 1),
                Field::record("tableRecord0", record.clone()),
            ],
        );

        assert_eq!(record.size_of(), 8);
        assert_eq!(record.encode().unwrap(), b"GSUB\x00\x00\x00\x0C");
        assert_eq!(
            table.encode().unwrap(),
            b"\x00\x01GSUB\x00\x00\x00\x0C".to_vec()
        );
        assert_eq!(record.get("offset"), Some(&Scalar::ULong(12)));
    }

    #[test]
    fn test_offset_overflow_names_table() {
        let table = Table::new(
            "huge",
            vec![
                Field::scalar("data", Scalar::CharArray(vec![0; 70_000])),
                Field::table("child", leaf("leaf", 1)),
            ],
        );

        assert_eq!(
            table.encode(),
            Err(WriteError::OffsetOverflow(String::from("huge")))
        );
        assert_eq!(
            table.size_of(),
            Err(WriteError::OffsetOverflow(String::from("huge")))
        );
    }

    #[test]
    fn test_nested_offset_overflow_names_inner_table() {
        let inner = Table::new(
            "inner",
            vec![
                Field::scalar("data", Scalar::CharArray(vec![0; 65_535])),
                Field::table("child", leaf("leaf", 1)),
            ],
        );
        let outer = Table::new("outer", vec![Field::table("inner", inner)]);

        assert_eq!(
            outer.encode(),
            Err(WriteError::OffsetOverflow(String::from("inner")))
        );
    }

    #[test]
    fn test_scalar_errors_propagate() {
        let table = Table::new("bad", vec![Field::scalar("v", Scalar::UInt24(0x0100_0000))]);
        assert_eq!(table.encode(), Err(WriteError::BadValue));
        assert_eq!(table.size_of(), Err(WriteError::BadValue));
    }

    #[test]
    fn test_overrides_replace_known_fields_only() {
        let fields = vec![Field::ushort("lookupType", 1), Field::ushort("lookupFlag", 0)];
        let overrides = FieldOverrides::new()
            .with("lookupFlag", Scalar::UShort(8))
            .with("unknown", Scalar::UShort(1));
        let table = Table::with_overrides("lookup", fields, &overrides).unwrap();

        assert_eq!(table.fields().len(), 2);
        assert_eq!(
            table.get("lookupFlag"),
            Some(&FieldValue::Scalar(Scalar::UShort(8)))
        );
        assert_eq!(table.get("unknown"), None);
        assert_eq!(table.encode().unwrap(), [0, 1, 0, 8]);
    }

    #[test]
    fn test_override_type_mismatch() {
        let fields = vec![Field::ushort("lookupFlag", 0)];
        let overrides = FieldOverrides::new().with("lookupFlag", Scalar::ULong(8));
        assert_eq!(
            Table::with_overrides("lookup", fields, &overrides),
            Err(WriteError::FieldTypeMismatch(String::from("lookupFlag")))
        );
    }

    #[test]
    fn test_ushort_list() {
        let fields = ushort_list("glyph", &[5, 9], None).unwrap();
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(names, ["glyphCount", "glyph0", "glyph1"]);
        assert_eq!(fields[0].value, FieldValue::Scalar(Scalar::UShort(2)));

        let fields = ushort_list("component", &[11], Some(2)).unwrap();
        assert_eq!(fields[0].value, FieldValue::Scalar(Scalar::UShort(2)));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_ushort_list_too_long() {
        let list = vec![0; 65_536];
        assert_eq!(ushort_list("glyph", &list, None), Err(WriteError::BadValue));
    }

    #[test]
    fn test_table_list_propagates_callback_error() {
        let result = table_list("subtable", &[1u16, 2], |&value, _| {
            if value == 2 {
                Err(WriteError::NotImplemented)
            } else {
                Ok(leaf("subtable", value))
            }
        });
        assert_eq!(result, Err(WriteError::NotImplemented));

        let fields = table_list::<_, WriteError, _>("subtable", &[7u16], |&value, _| {
            Ok(leaf("subtable", value))
        })
        .unwrap();
        assert_eq!(fields[1].name, "subtable0");
        assert_eq!(fields[1].field_type(), Some(FieldType::Table));
    }

    #[test]
    fn test_record_list_inlines_fields() {
        let fields = record_list::<_, WriteError, _>("rangeRecord", &[(1u16, 3u16)], |r, i| {
            Ok(vec![
                Field::ushort(format!("startGlyphID{}", i), r.0),
                Field::ushort(format!("endGlyphID{}", i), r.1),
            ])
        })
        .unwrap();
        let table = Table::new("coverage", fields);
        assert_eq!(table.encode().unwrap(), [0, 1, 0, 1, 0, 3]);
    }
}
