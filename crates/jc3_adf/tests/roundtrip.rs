use binrw::Endian;
use jc3_adf::document::{ArrayItems, ArrayNode, Document, MemberNode, Node, StructNode, Value};
use jc3_adf::error::Result;
use jc3_adf::types::{type_hashes, Container, MemberDefinition, Primitive, TypeDefinition};
use jc3_adf::write::{ContainerWriter, ContainerWriterOptions};
use jc3_adf::{DecoderOptions, InstanceDecoder, InstanceEncoder, RuntimeTypeLibrary};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use tracing::info;
use tracing_test::traced_test;

fn profile_types() -> (Vec<TypeDefinition>, u32) {
    let tag = TypeDefinition::string_hash("Tag");
    let tags = TypeDefinition::array("Tags", tag.name_hash);
    let color = TypeDefinition::inline_array("Color", type_hashes::UINT8, 4, 1, 1);
    let scores = TypeDefinition::array("Scores", type_hashes::FLOAT64);
    let names = TypeDefinition::array("Names", type_hashes::STRING);
    let entry = TypeDefinition::structure(
        "Entry",
        24,
        8,
        vec![
            MemberDefinition::primitive("Level", Primitive::Int16, 0),
            MemberDefinition::of("Color", &color, 2),
            MemberDefinition::of("Scores", &scores, 8),
        ],
    );
    let entries = TypeDefinition::array("Entries", entry.name_hash);
    let root = TypeDefinition::structure(
        "Profile",
        72,
        8,
        vec![
            MemberDefinition::string("Title", 0),
            MemberDefinition::primitive("Seed", Primitive::Int64, 8),
            MemberDefinition::of("Tags", &tags, 16),
            MemberDefinition::of("Entries", &entries, 32),
            MemberDefinition::of("Names", &names, 48),
            MemberDefinition::of("Owner", &tag, 64),
            MemberDefinition::primitive("Ratio", Primitive::Float32, 68),
        ],
    );
    let root_hash = root.name_hash;

    (
        vec![tag, tags, color, scores, names, entry, entries, root],
        root_hash,
    )
}

fn entry(level: &str, color: &[&str], scores: u64) -> StructNode {
    StructNode {
        type_name: "Entry".into(),
        name: None,
        id: None,
        members: vec![
            MemberNode::new("Level", Value::scalar(level)),
            MemberNode::new(
                "Color",
                Value::Array(ArrayNode {
                    id: None,
                    items: ArrayItems::Scalars(color.iter().map(|s| s.to_string()).collect()),
                }),
            ),
            MemberNode::new("Scores", Value::Reference(scores)),
        ],
    }
}

fn scalars(items: &[&str]) -> Node {
    Node::Array(ArrayNode {
        id: None,
        items: ArrayItems::Scalars(items.iter().map(|s| s.to_string()).collect()),
    })
}

fn with_id(node: Node, id: u64) -> Node {
    match node {
        Node::Array(array) => Node::Array(ArrayNode {
            id: Some(id),
            ..array
        }),
        other => other,
    }
}

/// A document laid out the way the decoder numbers it
fn profile_document() -> Document {
    Document::new(vec![
        Node::Struct(StructNode {
            type_name: "Profile".into(),
            name: Some("Profile".into()),
            id: Some(0),
            members: vec![
                MemberNode::new("Title", Value::scalar("Rico's save")),
                MemberNode::new("Seed", Value::scalar("-9007199254740993")),
                MemberNode::new("Tags", Value::Reference(1)),
                MemberNode::new("Entries", Value::Reference(2)),
                MemberNode::new("Names", Value::Reference(3)),
                MemberNode::new("Owner", Value::scalar("#00C0FFEE")),
                MemberNode::new("Ratio", Value::scalar("0.1")),
            ],
        }),
        with_id(scalars(&["hello", "world", ""]), 1),
        Node::Array(ArrayNode {
            id: Some(2),
            items: ArrayItems::Structs(vec![
                entry("-3", &["255", "128", "0", "1"], 4),
                entry("12", &["0", "0", "0", "0"], 5),
            ]),
        }),
        with_id(scalars(&["Medici", "two words", ""]), 3),
        with_id(scalars(&["1.5", "-0", "250000"]), 4),
        with_id(scalars(&[]), 5),
    ])
}

fn build(
    endian: Endian,
    types: &[TypeDefinition],
    root_hash: u32,
    document: &Document,
) -> Result<Vec<u8>> {
    let library = types.iter().cloned().collect::<RuntimeTypeLibrary>();

    let mut adf = ContainerWriter::new(
        Cursor::new(Vec::new()),
        ContainerWriterOptions::builder().endian(endian).build(),
    );
    let payload = InstanceEncoder::new(&library, adf.string_hashes_mut(), endian)
        .encode(root_hash, document)?;
    adf.add_instance("Profile", root_hash, &payload)?;

    Ok(adf.finish()?.into_inner())
}

fn decode(bytes: &[u8], types: &[TypeDefinition]) -> Result<Document> {
    let container = Container::from_bytes(bytes)?;
    let library = types.iter().cloned().collect::<RuntimeTypeLibrary>();
    let decoder = InstanceDecoder::new(&container, &library, DecoderOptions::default());

    let mut documents = decoder.decode_all(bytes)?;
    Ok(documents.remove(0))
}

#[traced_test]
#[test]
fn encode_then_decode() -> Result<()> {
    let (types, root_hash) = profile_types();
    let document = profile_document();

    for endian in [Endian::Little, Endian::Big] {
        let bytes = build(endian, &types, root_hash, &document)?;
        info!("encoded {} bytes", bytes.len());

        let decoded = decode(&bytes, &types)?;
        assert_eq!(decoded, document);

        // decoding the re-encoded document is stable
        let again = build(endian, &types, root_hash, &decoded)?;
        assert_eq!(again, bytes);
    }

    Ok(())
}

#[traced_test]
#[test]
fn string_hashes_follow_the_payload() -> Result<()> {
    let (types, root_hash) = profile_types();
    let bytes = build(Endian::Little, &types, root_hash, &profile_document())?;
    let container = Container::from_bytes(&bytes)?;

    let values = container
        .string_hashes
        .iter()
        .map(|info| info.value.as_str())
        .collect::<Vec<_>>();
    // ascending hash order: world (0x9099ABE4) before hello (0xC8FD181B)
    assert_eq!(values, vec!["world", "hello"]);

    Ok(())
}

#[traced_test]
#[test]
fn endianness_symmetry() -> Result<()> {
    let (types, root_hash) = profile_types();
    let document = profile_document();

    let little = Container::from_bytes(&build(Endian::Little, &types, root_hash, &document)?)?;
    let big = Container::from_bytes(&build(Endian::Big, &types, root_hash, &document)?)?;

    assert_eq!(little.endian, Endian::Little);
    assert_eq!(big.endian, Endian::Big);
    assert_eq!(little.comment, big.comment);
    assert_eq!(little.instances, big.instances);
    assert_eq!(little.type_definitions, big.type_definitions);
    assert_eq!(little.string_hashes, big.string_hashes);

    Ok(())
}

#[traced_test]
#[test]
fn embedded_types_round_trip() -> Result<()> {
    let (types, root_hash) = profile_types();
    let library = types.iter().cloned().collect::<RuntimeTypeLibrary>();

    let mut adf = ContainerWriter::new(Cursor::new(Vec::new()), ContainerWriterOptions::default());
    for definition in &types {
        adf.add_type_definition(definition.clone())?;
    }
    let payload = InstanceEncoder::new(&library, adf.string_hashes_mut(), Endian::Little)
        .encode(root_hash, &profile_document())?;
    adf.add_instance("Profile", root_hash, &payload)?;
    let bytes = adf.finish()?.into_inner();

    let container = Container::from_bytes(&bytes)?;
    assert_eq!(container.type_definitions, types);

    // no external library needed once the schema is embedded
    let empty = RuntimeTypeLibrary::new();
    let decoder = InstanceDecoder::new(&container, &empty, DecoderOptions::default());
    assert_eq!(decoder.decode_all(&bytes)?, vec![profile_document()]);

    Ok(())
}
