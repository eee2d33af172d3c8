//! Resolution of type hashes to their definitions.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, FormatError, Result};
use crate::types::{Container, TypeDefinition};

/// Something that can turn a type hash into a [`TypeDefinition`]
pub trait TypeLibrary {
    /// Look up `type_hash`, failing with [`Error::UnresolvedType`] when it is unknown
    fn resolve(&self, type_hash: u32) -> Result<&TypeDefinition>;
}

/// Type definitions gathered at runtime, from containers or built by hand
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeTypeLibrary {
    definitions: IndexMap<u32, TypeDefinition>,
}

impl RuntimeTypeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition
    ///
    /// Registering the same definition again is accepted, a different definition under a known
    /// hash is a [`FormatError::TypeConflict`].
    pub fn add(&mut self, definition: TypeDefinition) -> Result<()> {
        if let Some(existing) = self.definitions.get(&definition.name_hash) {
            if *existing != definition {
                return Err(FormatError::TypeConflict(definition.name_hash).into());
            }
            return Ok(());
        }

        self.definitions.insert(definition.name_hash, definition);
        Ok(())
    }

    /// Register every definition embedded in `container`
    pub fn add_container(&mut self, container: &Container) -> Result<()> {
        for definition in &container.type_definitions {
            self.add(definition.clone())?;
        }
        debug!(
            added = container.type_definitions.len(),
            total = self.definitions.len(),
            "loaded type definitions"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.definitions.values()
    }
}

impl TypeLibrary for RuntimeTypeLibrary {
    fn resolve(&self, type_hash: u32) -> Result<&TypeDefinition> {
        self.definitions
            .get(&type_hash)
            .ok_or(Error::UnresolvedType(type_hash))
    }
}

/// A container can describe its own instances
impl TypeLibrary for Container {
    fn resolve(&self, type_hash: u32) -> Result<&TypeDefinition> {
        self.type_definitions
            .iter()
            .find(|d| d.name_hash == type_hash)
            .ok_or(Error::UnresolvedType(type_hash))
    }
}

impl FromIterator<TypeDefinition> for RuntimeTypeLibrary {
    /// Later duplicates of a hash are ignored
    fn from_iter<T: IntoIterator<Item = TypeDefinition>>(iter: T) -> Self {
        let mut definitions = IndexMap::new();
        for definition in iter {
            definitions.entry(definition.name_hash).or_insert(definition);
        }
        RuntimeTypeLibrary { definitions }
    }
}

#[cfg(test)]
mod test {
    use binrw::Endian;

    use crate::error::{Error, FormatError, Result};
    use crate::library::{RuntimeTypeLibrary, TypeLibrary};
    use crate::types::{Container, MemberDefinition, Primitive, TypeDefinition};

    fn pair() -> TypeDefinition {
        TypeDefinition::structure(
            "Pair",
            8,
            4,
            vec![
                MemberDefinition::primitive("a", Primitive::Int32, 0),
                MemberDefinition::primitive("b", Primitive::Float32, 4),
            ],
        )
    }

    #[test]
    fn resolve_registered() -> Result<()> {
        let mut library = RuntimeTypeLibrary::new();
        library.add(pair())?;
        library.add(pair())?;

        assert_eq!(library.len(), 1);
        assert_eq!(library.resolve(pair().name_hash)?.name, "Pair");
        assert!(matches!(
            library.resolve(0x12345678),
            Err(Error::UnresolvedType(0x12345678))
        ));

        Ok(())
    }

    #[test]
    fn conflicting_definition() -> Result<()> {
        let mut library = RuntimeTypeLibrary::new();
        library.add(pair())?;

        let mut other = pair();
        other.size = 16;
        assert!(matches!(
            library.add(other),
            Err(Error::Format(FormatError::TypeConflict(_)))
        ));

        Ok(())
    }

    #[test]
    fn container_library() -> Result<()> {
        let mut container = Container::new(Endian::Little);
        container.type_definitions.push(pair());

        assert_eq!(container.resolve(pair().name_hash)?.members.len(), 2);

        let mut library = RuntimeTypeLibrary::new();
        library.add_container(&container)?;
        library.add_container(&container)?;
        assert_eq!(library.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(), vec!["Pair"]);

        Ok(())
    }
}
