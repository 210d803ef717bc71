use indexmap::IndexMap;

use crate::error::Error;
use crate::grammer::ast::Type;

/// Index into the struct table. Structs compare by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructId(usize);

/// Resolved type. Every scalar is one 4-byte word.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarType {
    Int,
    Uint,
    Bool,
    Char,
    Pointer(Box<VarType>),
    Array(Box<VarType>, usize),
    Struct(StructId),
}

impl VarType {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            VarType::Int | VarType::Uint | VarType::Bool | VarType::Char | VarType::Pointer(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub ty: VarType,
    pub disp: u32,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, Field>,
    /// `None` while the struct body is being resolved.
    pub size: Option<u32>,
}

#[derive(Debug, Default)]
pub struct TypeTable {
    structs: IndexMap<String, StructDef>,
}

impl TypeTable {
    pub fn new() -> Self {
        TypeTable::default()
    }

    pub fn clear(&mut self) {
        self.structs.clear();
    }

    /// Register a struct name so that its fields may point at it.
    pub fn declare(&mut self, name: &str) -> Result<StructId, Error> {
        if self.structs.contains_key(name) {
            return Err(Error::Redefined(format!("struct {name}")));
        }
        let (idx, _) = self.structs.insert_full(
            name.to_string(),
            StructDef {
                name: name.to_string(),
                fields: IndexMap::new(),
                size: None,
            },
        );
        Ok(StructId(idx))
    }

    /// Lay out the fields of a declared struct in declaration order.
    pub fn define(&mut self, id: StructId, fields: &[(Type, String)]) -> Result<(), Error> {
        let mut layout = IndexMap::new();
        let mut disp = 0;
        for (ty, name) in fields {
            let ty = self.resolve(ty)?;
            let size = self.size_of(&ty)?;
            if layout.insert(name.clone(), Field { ty, disp }).is_some() {
                return Err(Error::Redefined(name.clone()));
            }
            disp = u32::checked_add(disp, size)
                .ok_or_else(|| Error::TooLarge(format!("struct {}", self.get(id).name)))?;
        }
        let def = self.get_mut(id);
        def.fields = layout;
        def.size = Some(disp);
        Ok(())
    }

    fn get_mut(&mut self, id: StructId) -> &mut StructDef {
        &mut self.structs[id.0]
    }

    pub fn get(&self, id: StructId) -> &StructDef {
        &self.structs[id.0]
    }

    pub fn resolve(&self, ty: &Type) -> Result<VarType, Error> {
        Ok(match ty {
            Type::Int => VarType::Int,
            Type::Uint => VarType::Uint,
            Type::Bool => VarType::Bool,
            Type::Char => VarType::Char,
            Type::Pointer(inner) => VarType::Pointer(Box::new(self.resolve(inner)?)),
            Type::Array(inner, len) => VarType::Array(Box::new(self.resolve(inner)?), *len),
            Type::Struct(name) => match self.structs.get_index_of(name) {
                Some(idx) => VarType::Struct(StructId(idx)),
                None => return Err(Error::UnknownType(format!("struct {name}"))),
            },
        })
    }

    /// Size in bytes. Fails on a struct whose body is still open, which is
    /// how a struct containing itself by value is caught.
    pub fn size_of(&self, ty: &VarType) -> Result<u32, Error> {
        match ty {
            VarType::Int | VarType::Uint | VarType::Bool | VarType::Char | VarType::Pointer(_) => {
                Ok(4)
            }
            VarType::Array(inner, len) => {
                let elem = self.size_of(inner)?;
                u32::try_from(*len)
                    .ok()
                    .and_then(|len| elem.checked_mul(len))
                    .ok_or_else(|| Error::TooLarge(self.describe(ty)))
            }
            VarType::Struct(id) => {
                let def = self.get(*id);
                def.size
                    .ok_or_else(|| Error::RecursiveStruct(def.name.clone()))
            }
        }
    }

    pub fn field(&self, id: StructId, name: &str) -> Result<&Field, Error> {
        let def = self.get(id);
        def.fields
            .get(name)
            .ok_or_else(|| Error::NoSuchField(format!("struct {}", def.name), name.to_string()))
    }

    /// Human readable type name.
    pub fn describe(&self, ty: &VarType) -> String {
        match ty {
            VarType::Int => "int".to_string(),
            VarType::Uint => "uint".to_string(),
            VarType::Bool => "bool".to_string(),
            VarType::Char => "char".to_string(),
            VarType::Pointer(inner) => format!("{}*", self.describe(inner)),
            VarType::Array(inner, len) => format!("{}[{}]", self.describe(inner), len),
            VarType::Struct(id) => format!("struct {}", self.get(*id).name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Vec<(Type, String)> {
        vec![
            (Type::Int, "value".to_string()),
            (
                Type::Pointer(Box::new(Type::Struct("node".to_string()))),
                "next".to_string(),
            ),
            (Type::Array(Box::new(Type::Char), 3), "tag".to_string()),
        ]
    }

    #[test]
    fn struct_layout() {
        let mut table = TypeTable::new();
        let id = table.declare("node").unwrap();
        table.define(id, &node()).unwrap();

        assert_eq!(table.size_of(&VarType::Struct(id)).unwrap(), 20);
        assert_eq!(table.field(id, "value").unwrap().disp, 0);
        assert_eq!(table.field(id, "next").unwrap().disp, 4);
        assert_eq!(table.field(id, "tag").unwrap().disp, 8);
        assert_eq!(
            table.field(id, "next").unwrap().ty,
            VarType::Pointer(Box::new(VarType::Struct(id)))
        );
        assert!(matches!(table.field(id, "prev"), Err(Error::NoSuchField(..))));
    }

    #[test]
    fn nominal_identity() {
        let mut table = TypeTable::new();
        let a = table.declare("a").unwrap();
        let b = table.declare("b").unwrap();
        let fields = vec![(Type::Int, "x".to_string())];
        table.define(a, &fields).unwrap();
        table.define(b, &fields).unwrap();
        assert_ne!(VarType::Struct(a), VarType::Struct(b));
        assert_eq!(table.describe(&VarType::Struct(b)), "struct b");
    }

    #[test]
    fn self_containing_struct_rejected() {
        let mut table = TypeTable::new();
        let id = table.declare("loop").unwrap();
        let fields = vec![(Type::Struct("loop".to_string()), "inner".to_string())];
        assert!(matches!(
            table.define(id, &fields),
            Err(Error::RecursiveStruct(name)) if name == "loop"
        ));
    }

    #[test]
    fn unknown_and_duplicate() {
        let mut table = TypeTable::new();
        assert!(matches!(
            table.resolve(&Type::Struct("nope".to_string())),
            Err(Error::UnknownType(_))
        ));
        table.declare("s").unwrap();
        assert!(matches!(table.declare("s"), Err(Error::Redefined(_))));
    }

    #[test]
    fn oversized_types_rejected() {
        let mut table = TypeTable::new();
        let huge = VarType::Array(Box::new(VarType::Int), 1 << 30);
        assert!(matches!(
            table.size_of(&huge),
            Err(Error::TooLarge(name)) if name == "int[1073741824]"
        ));

        let id = table.declare("pair").unwrap();
        let half = Type::Array(Box::new(Type::Int), 1 << 29);
        let fields = vec![(half.clone(), "a".to_string()), (half, "b".to_string())];
        assert!(matches!(
            table.define(id, &fields),
            Err(Error::TooLarge(name)) if name == "struct pair"
        ));
    }

    #[test]
    fn array_size() {
        let table = TypeTable::new();
        let ty = VarType::Array(Box::new(VarType::Array(Box::new(VarType::Int), 3)), 2);
        assert_eq!(table.size_of(&ty).unwrap(), 24);
        assert_eq!(table.describe(&ty), "int[3][2]");
    }
}
