use otlayout::error::WriteError;
use otlayout::table::{table_list, ushort_list, Field, FieldOverrides, Table};
use otlayout::types::{self, FieldType, Fixed, Scalar};

#[test]
fn test_nested_tables() {
    let glyphs = [vec![1, 2], vec![3]];
    let mut fields = vec![Field::scalar("version", Scalar::Fixed(Fixed::ONE))];
    fields.extend(
        table_list("glyphSet", &glyphs, |set, _| -> Result<Table, WriteError> {
            Ok(Table::new("GlyphSet", ushort_list("glyph", set, None)?))
        })
        .unwrap(),
    );
    let table = Table::new("Test", fields);

    #[rustfmt::skip]
    let expected: &[u8] = &[
        0x00, 0x01, 0x00, 0x00, // version
        0x00, 0x02, // glyphSetCount
        0x00, 0x0A, // glyphSet0
        0x00, 0x10, // glyphSet1
        0x00, 0x02, 0x00, 0x01, 0x00, 0x02,
        0x00, 0x01, 0x00, 0x03,
    ];
    assert_eq!(table.encode().unwrap(), expected);
    assert_eq!(table.size_of().unwrap(), expected.len());
}

#[test]
fn test_overrides() {
    let overrides = FieldOverrides::new().with("unitsPerEm", Scalar::UShort(2048));
    let table = Table::with_overrides(
        "head",
        vec![
            Field::ushort("unitsPerEm", 1000),
            Field::scalar("created", Scalar::LongDateTime(Default::default())),
        ],
        &overrides,
    )
    .unwrap();
    assert_eq!(&table.encode().unwrap()[0..2], &[0x08, 0x00]);
}

#[test]
fn test_scalar_codec() {
    let value = Scalar::from_int(FieldType::Short, -2).unwrap();
    let data = types::encode(&value).unwrap();
    assert_eq!(data, vec![0xFF, 0xFE]);
    assert_eq!(types::decode(FieldType::Short, &data), Ok(value));
    assert_eq!(
        Scalar::from_int(FieldType::Byte, 256),
        Err(WriteError::BadValue)
    );
}
