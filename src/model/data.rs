//! Lossless mapping between [`Module`] and generic JSON data.
//!
//! Every key is always present; absent options are `null`. Kinds travel as
//! spec strings and are resolved again on the way back in against the
//! declarations of the module and its imports.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value as Json};

use crate::diagnostics::DataError;

use super::*;

// ===== Encoding =====

pub fn module_to_data(module: &Module) -> Json {
    json!({
        "name": module.name,
        "namespace": module.namespace,
        "attributes": attributes_to_data(&module.attributes),
        "imports": module.imports.iter().map(|m| module_to_data(m)).collect::<Vec<_>>(),
        "structs": module.structs.iter().map(struct_to_data).collect::<Vec<_>>(),
        "unions": module.unions.iter().map(union_to_data).collect::<Vec<_>>(),
        "enums": module.enums.iter().map(enum_to_data).collect::<Vec<_>>(),
        "interfaces": module.interfaces.iter().map(interface_to_data).collect::<Vec<_>>(),
        "constants": module.constants.iter().map(constant_to_data).collect::<Vec<_>>(),
    })
}

fn attributes_to_data(attributes: &Attributes) -> Json {
    let map: Map<String, Json> = attributes
        .iter()
        .map(|(key, value)| {
            let value = match value {
                AttributeValue::Bool(b) => Json::from(*b),
                AttributeValue::Int(n) => Json::from(*n),
                AttributeValue::String(s) => Json::from(s.as_str()),
            };
            (key.clone(), value)
        })
        .collect();
    Json::Object(map)
}

fn struct_to_data(s: &Struct) -> Json {
    json!({
        "name": s.name,
        "attributes": attributes_to_data(&s.attributes),
        "fields": s.fields.iter().map(field_to_data).collect::<Vec<_>>(),
        "enums": s.enums.iter().map(enum_to_data).collect::<Vec<_>>(),
        "constants": s.constants.iter().map(constant_to_data).collect::<Vec<_>>(),
    })
}

fn field_to_data(f: &Field) -> Json {
    json!({
        "name": f.name,
        "kind": f.kind.spec(),
        "ordinal": f.ordinal,
        "default": f.default_value.as_ref().map(value_to_data),
        "attributes": attributes_to_data(&f.attributes),
    })
}

fn union_to_data(u: &Union) -> Json {
    json!({
        "name": u.name,
        "attributes": attributes_to_data(&u.attributes),
        "fields": u.fields.iter().map(field_to_data).collect::<Vec<_>>(),
    })
}

fn enum_to_data(e: &Enum) -> Json {
    let fields: Vec<Json> = e
        .fields
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "value": f.value,
                "attributes": attributes_to_data(&f.attributes),
            })
        })
        .collect();
    json!({
        "name": e.name,
        "attributes": attributes_to_data(&e.attributes),
        "fields": fields,
    })
}

fn interface_to_data(i: &Interface) -> Json {
    json!({
        "name": i.name,
        "client": i.client,
        "attributes": attributes_to_data(&i.attributes),
        "methods": i.methods.iter().map(method_to_data).collect::<Vec<_>>(),
        "enums": i.enums.iter().map(enum_to_data).collect::<Vec<_>>(),
        "constants": i.constants.iter().map(constant_to_data).collect::<Vec<_>>(),
    })
}

fn method_to_data(m: &Method) -> Json {
    json!({
        "name": m.name,
        "ordinal": m.ordinal,
        "attributes": attributes_to_data(&m.attributes),
        "parameters": m.parameters.iter().map(parameter_to_data).collect::<Vec<_>>(),
        "response_parameters": m
            .response_parameters
            .as_ref()
            .map(|ps| ps.iter().map(parameter_to_data).collect::<Vec<_>>()),
    })
}

fn parameter_to_data(p: &Parameter) -> Json {
    json!({
        "name": p.name,
        "kind": p.kind.spec(),
        "ordinal": p.ordinal,
        "attributes": attributes_to_data(&p.attributes),
    })
}

fn constant_to_data(c: &Constant) -> Json {
    json!({
        "name": c.name,
        "kind": c.kind.spec(),
        "value": value_to_data(&c.value),
        "attributes": attributes_to_data(&c.attributes),
    })
}

fn value_to_data(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::from(*b),
        Value::Int(n) => Json::from(*n),
        Value::Float(x) => Json::from(*x),
        Value::String(s) => Json::from(s.as_str()),
        Value::Default => json!({ "default": true }),
        Value::Enum { kind, label, value } => json!({
            "enum": Kind::Enum(kind.clone()).spec(),
            "label": label,
            "value": value,
        }),
    }
}

// ===== Decoding =====

/// Rebuild a module from data produced by [`module_to_data`].
pub fn module_from_data(data: &Json) -> Result<Module, DataError> {
    let mut decoded = HashMap::new();
    decode_module(data, &mut decoded).map(|m| Arc::unwrap_or_clone(m))
}

/// Decode one module; imports already decoded under the same name are shared.
fn decode_module(
    data: &Json,
    decoded: &mut HashMap<String, Arc<Module>>,
) -> Result<Arc<Module>, DataError> {
    let obj = Reader::object(data, "module".to_string())?;
    let name = obj.string("name")?;
    if let Some(existing) = decoded.get(&name) {
        return Ok(existing.clone());
    }
    let context = format!("module '{}'", name);
    let obj = Reader::object(data, context)?;
    let namespace = obj.string("namespace")?;

    let mut imports = Vec::new();
    for import in obj.array("imports")? {
        imports.push(decode_module(import, decoded)?);
    }

    // First pass: declaration names only, so kinds can refer forward.
    let mut shell = Module::new(name.clone(), namespace);
    shell.imports = imports;
    for s in obj.array("structs")? {
        let s = obj.child(s, "struct")?;
        let mut decl = Struct::new(s.string("name")?, &name);
        decl.enums = s.decl_names("enums", &name)?;
        shell.structs.push(decl);
    }
    for u in obj.array("unions")? {
        shell.unions.push(Union::new(obj.child(u, "union")?.string("name")?, &name));
    }
    for e in obj.array("enums")? {
        shell.enums.push(Enum::new(obj.child(e, "enum")?.string("name")?, &name));
    }
    for i in obj.array("interfaces")? {
        let i = obj.child(i, "interface")?;
        let mut decl = Interface::new(i.string("name")?, &name);
        decl.enums = i.decl_names("enums", &name)?;
        shell.interfaces.push(decl);
    }
    let table = KindTable::for_module(&shell);

    // Second pass: full contents.
    let decoder = Decoder {
        table: &table,
        module: &name,
    };
    let mut module = Module::new(name.clone(), shell.namespace);
    module.imports = shell.imports;
    module.attributes = obj.attributes()?;
    for s in obj.array("structs")? {
        module.structs.push(decoder.structure(&obj.child(s, "struct")?)?);
    }
    for u in obj.array("unions")? {
        module.unions.push(decoder.union(&obj.child(u, "union")?)?);
    }
    for e in obj.array("enums")? {
        module.enums.push(decoder.enumeration(&obj.child(e, "enum")?)?);
    }
    for i in obj.array("interfaces")? {
        module.interfaces.push(decoder.interface(&obj.child(i, "interface")?)?);
    }
    module.constants = decoder.constants(&obj)?;

    let module = Arc::new(module);
    decoded.insert(name, module.clone());
    Ok(module)
}

/// Typed accessors over one JSON object, with the path used in errors.
struct Reader<'a> {
    map: &'a Map<String, Json>,
    context: String,
}

impl<'a> Reader<'a> {
    fn object(value: &'a Json, context: String) -> Result<Self, DataError> {
        match value {
            Json::Object(map) => Ok(Reader { map, context }),
            _ => Err(DataError::InvalidValue {
                key: String::new(),
                context,
                expected: "an object",
            }),
        }
    }

    fn child(&self, value: &'a Json, what: &str) -> Result<Reader<'a>, DataError> {
        let name = value.get("name").and_then(Json::as_str).unwrap_or("?");
        Reader::object(value, format!("{} '{}' in {}", what, name, self.context))
    }

    fn get(&self, key: &str) -> Result<&'a Json, DataError> {
        self.map.get(key).ok_or_else(|| DataError::MissingKey {
            key: key.to_string(),
            context: self.context.clone(),
        })
    }

    fn invalid(&self, key: &str, expected: &'static str) -> DataError {
        DataError::InvalidValue {
            key: key.to_string(),
            context: self.context.clone(),
            expected,
        }
    }

    fn string(&self, key: &str) -> Result<String, DataError> {
        self.get(key)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(key, "a string"))
    }

    fn opt_string(&self, key: &str) -> Result<Option<String>, DataError> {
        match self.get(key)? {
            Json::Null => Ok(None),
            Json::String(s) => Ok(Some(s.clone())),
            _ => Err(self.invalid(key, "a string or null")),
        }
    }

    fn u32(&self, key: &str) -> Result<u32, DataError> {
        self.get(key)?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| self.invalid(key, "a 32-bit ordinal"))
    }

    fn opt_u32(&self, key: &str) -> Result<Option<u32>, DataError> {
        match self.get(key)? {
            Json::Null => Ok(None),
            _ => self.u32(key).map(Some),
        }
    }

    fn i64(&self, key: &str) -> Result<i64, DataError> {
        self.get(key)?
            .as_i64()
            .ok_or_else(|| self.invalid(key, "an integer"))
    }

    fn array(&self, key: &str) -> Result<&'a [Json], DataError> {
        self.get(key)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(key, "an array"))
    }

    fn attributes(&self) -> Result<Attributes, DataError> {
        let value = self.get("attributes")?;
        serde_json::from_value(value.clone())
            .map_err(|_| self.invalid("attributes", "an object of bool, integer or string values"))
    }

    /// Names of nested enums, for the first decoding pass.
    fn decl_names(&self, key: &str, module: &str) -> Result<Vec<Enum>, DataError> {
        self.array(key)?
            .iter()
            .map(|e| Ok(Enum::new(self.child(e, "enum")?.string("name")?, module)))
            .collect()
    }
}

struct Decoder<'a> {
    table: &'a KindTable,
    module: &'a str,
}

impl Decoder<'_> {
    fn kind(&self, obj: &Reader<'_>) -> Result<Kind, DataError> {
        self.table.parse(&obj.string("kind")?)
    }

    fn structure(&self, obj: &Reader<'_>) -> Result<Struct, DataError> {
        let mut s = Struct::new(obj.string("name")?, self.module);
        s.attributes = obj.attributes()?;
        s.fields = self.fields(obj, true)?;
        for e in obj.array("enums")? {
            s.enums.push(self.enumeration(&obj.child(e, "enum")?)?);
        }
        s.constants = self.constants(obj)?;
        Ok(s)
    }

    fn union(&self, obj: &Reader<'_>) -> Result<Union, DataError> {
        let mut u = Union::new(obj.string("name")?, self.module);
        u.attributes = obj.attributes()?;
        u.fields = self.fields(obj, false)?;
        Ok(u)
    }

    fn fields(&self, obj: &Reader<'_>, with_defaults: bool) -> Result<Vec<Field>, DataError> {
        obj.array("fields")?
            .iter()
            .map(|f| {
                let f = obj.child(f, "field")?;
                let mut field = Field::new(f.string("name")?, self.kind(&f)?, f.opt_u32("ordinal")?);
                field.attributes = f.attributes()?;
                if with_defaults {
                    field.default_value = match f.get("default")? {
                        Json::Null => None,
                        value => Some(self.value(value, &f, "default")?),
                    };
                }
                Ok(field)
            })
            .collect()
    }

    fn enumeration(&self, obj: &Reader<'_>) -> Result<Enum, DataError> {
        let mut e = Enum::new(obj.string("name")?, self.module);
        e.attributes = obj.attributes()?;
        for f in obj.array("fields")? {
            let f = obj.child(f, "enum value")?;
            let mut field = EnumField::new(f.string("name")?, f.i64("value")?);
            field.attributes = f.attributes()?;
            e.fields.push(field);
        }
        Ok(e)
    }

    fn interface(&self, obj: &Reader<'_>) -> Result<Interface, DataError> {
        let mut i = Interface::new(obj.string("name")?, self.module);
        i.attributes = obj.attributes()?;
        i.client = obj.opt_string("client")?;
        for m in obj.array("methods")? {
            let m = obj.child(m, "method")?;
            let mut method = Method::new(m.string("name")?, m.u32("ordinal")?);
            method.attributes = m.attributes()?;
            method.parameters = self.parameters(&m, m.array("parameters")?)?;
            method.response_parameters = match m.get("response_parameters")? {
                Json::Null => None,
                Json::Array(ps) => Some(self.parameters(&m, ps)?),
                _ => return Err(m.invalid("response_parameters", "an array or null")),
            };
            i.methods.push(method);
        }
        for e in obj.array("enums")? {
            i.enums.push(self.enumeration(&obj.child(e, "enum")?)?);
        }
        i.constants = self.constants(obj)?;
        Ok(i)
    }

    fn parameters(&self, method: &Reader<'_>, items: &[Json]) -> Result<Vec<Parameter>, DataError> {
        items
            .iter()
            .map(|p| {
                let p = method.child(p, "parameter")?;
                let mut param = Parameter::new(p.string("name")?, self.kind(&p)?, p.u32("ordinal")?);
                param.attributes = p.attributes()?;
                Ok(param)
            })
            .collect()
    }

    fn constants(&self, obj: &Reader<'_>) -> Result<Vec<Constant>, DataError> {
        obj.array("constants")?
            .iter()
            .map(|c| {
                let c = obj.child(c, "constant")?;
                let value = self.value(c.get("value")?, &c, "value")?;
                let mut constant = Constant::new(c.string("name")?, self.kind(&c)?, value);
                constant.attributes = c.attributes()?;
                Ok(constant)
            })
            .collect()
    }

    fn value(&self, data: &Json, owner: &Reader<'_>, key: &str) -> Result<Value, DataError> {
        match data {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Int(i)),
                None => n
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| owner.invalid(key, "a number")),
            },
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Object(map) if map.contains_key("default") => Ok(Value::Default),
            Json::Object(_) => {
                let obj = Reader::object(data, owner.context.clone())?;
                let spec = obj.string("enum")?;
                let kind = match self.table.parse(&spec)? {
                    Kind::Enum(decl) => decl,
                    _ => return Err(owner.invalid(key, "an enum value")),
                };
                Ok(Value::Enum {
                    kind,
                    label: obj.string("label")?,
                    value: obj.i64("value")?,
                })
            }
            _ => Err(owner.invalid(key, "a constant value")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_import() -> Module {
        let mut module = Module::new("base.mojom", "base");
        let mut point = Struct::new("Point", "base.mojom");
        point.fields.push(Field::new("x", Kind::Int32, Some(0)));
        module.structs.push(point);
        module
    }

    #[test]
    fn test_round_trip_with_forward_reference() {
        let base = Arc::new(sample_import());
        let mut module = Module::new("shapes.mojom", "shapes");
        module.imports.push(base.clone());

        let line_ref = module.decl_ref("Line");
        let mut holder = Struct::new("Holder", "shapes.mojom");
        holder
            .fields
            .push(Field::new("line", Kind::nullable(Kind::Struct(line_ref)), Some(0)));
        holder.fields.push(Field::new(
            "points",
            Kind::array(Kind::Struct(base.decl_ref("Point"))),
            Some(1),
        ));
        module.structs.push(holder);
        module.structs.push(Struct::new("Line", "shapes.mojom"));

        let data = module_to_data(&module);
        let decoded = module_from_data(&data).unwrap();
        assert_eq!(decoded, module);
    }

    #[test]
    fn test_values_round_trip() {
        let mut module = Module::new("v.mojom", "");
        let mut color = Enum::new("Color", "v.mojom");
        color.fields.push(EnumField::new("RED", 0));
        module.enums.push(color);
        let color_ref = module.decl_ref("Color");
        module.constants = vec![
            Constant::new("kB", Kind::Bool, Value::Bool(true)),
            Constant::new("kI", Kind::Int64, Value::Int(-7)),
            Constant::new("kF", Kind::Double, Value::Float(1.0)),
            Constant::new("kS", Kind::String, Value::String("hi".into())),
            Constant::new(
                "kE",
                Kind::Enum(color_ref.clone()),
                Value::Enum {
                    kind: color_ref,
                    label: "RED".into(),
                    value: 0,
                },
            ),
        ];
        let text = serde_json::to_string(&module_to_data(&module)).unwrap();
        let reparsed: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(module_from_data(&reparsed).unwrap(), module);
    }

    #[test]
    fn test_absent_options_are_null() {
        let mut module = Module::new("n.mojom", "");
        let mut iface = Interface::new("Sink", "n.mojom");
        iface.methods.push(Method::new("Push", 0));
        module.interfaces.push(iface);
        let data = module_to_data(&module);
        let method = &data["interfaces"][0]["methods"][0];
        assert!(method["response_parameters"].is_null());
        assert!(data["interfaces"][0]["client"].is_null());
    }

    #[test]
    fn test_missing_key_reported() {
        let data = json!({ "name": "m.mojom" });
        assert!(matches!(
            module_from_data(&data),
            Err(DataError::MissingKey { ref key, .. }) if key == "namespace"
        ));
    }

    #[test]
    fn test_shared_imports_decode_once() {
        let base = Arc::new(sample_import());
        let mut mid = Module::new("mid.mojom", "mid");
        mid.imports.push(base.clone());
        let mut top = Module::new("top.mojom", "top");
        top.imports.push(base);
        top.imports.push(Arc::new(mid));

        let decoded = module_from_data(&module_to_data(&top)).unwrap();
        assert!(Arc::ptr_eq(&decoded.imports[0], &decoded.imports[1].imports[0]));
        assert_eq!(decoded, top);
    }

    // ===== Generated modules =====

    use proptest::prelude::*;

    /// Imports that share the `shared` namespace. `twin.mojom` pulls in a
    /// third module declaring `shared.Point`, which `base.mojom` declares too;
    /// only the direct import's `Point` is visible from the root.
    fn shared_imports() -> Vec<Arc<Module>> {
        let mut deep = Module::new("deep/point.mojom", "shared");
        deep.structs.push(Struct::new("Point", "deep/point.mojom"));
        let deep = Arc::new(deep);

        let mut base = Module::new("base.mojom", "shared");
        base.structs.push(Struct::new("Point", "base.mojom"));
        let mut color = Enum::new("Color", "base.mojom");
        color.fields.push(EnumField::new("RED", 0));
        color.fields.push(EnumField::new("BLUE", 7));
        base.enums.push(color);

        let mut twin = Module::new("twin.mojom", "shared");
        let mut line = Struct::new("Line", "twin.mojom");
        line.fields
            .push(Field::new("start", Kind::Struct(deep.decl_ref("Point")), Some(0)));
        twin.structs.push(line);
        twin.unions.push(Union::new("Shape", "twin.mojom"));
        twin.interfaces.push(Interface::new("Canvas", "twin.mojom"));
        twin.imports.push(deep);

        vec![Arc::new(base), Arc::new(twin)]
    }

    /// Root declarations without members.
    fn skeleton(namespace: &str) -> Module {
        let name = "app/root.mojom";
        let mut module = Module::new(name, namespace);
        module.imports = shared_imports();
        let mut holder = Struct::new("Holder", name);
        let mut mode = Enum::new("Mode", name);
        mode.fields.push(EnumField::new("OFF", 0));
        mode.fields.push(EnumField::new("ON", 1));
        holder.enums.push(mode);
        module.structs.push(holder);
        module.unions.push(Union::new("Event", name));
        module.interfaces.push(Interface::new("Sink", name));
        module
    }

    /// Declaration kinds the root can name, interface requests included.
    fn visible_kinds(module: &Module) -> Vec<Kind> {
        let mut kinds = module.declared_kinds();
        for import in &module.imports {
            kinds.extend(import.declared_kinds());
        }
        let requests: Vec<Kind> = kinds
            .iter()
            .filter_map(|k| Kind::interface_request(k).ok())
            .collect();
        kinds.extend(requests);
        kinds
    }

    fn kind_strategy(decls: Vec<Kind>) -> BoxedStrategy<Kind> {
        let map_keys: Vec<Kind> = [Kind::Bool, Kind::Int32, Kind::Uint64, Kind::Double, Kind::String]
            .into_iter()
            .chain(decls.iter().filter(|k| matches!(k, Kind::Enum(_))).cloned())
            .collect();
        let leaf = prop_oneof![
            prop::sample::select(vec![
                Kind::Bool,
                Kind::Int8,
                Kind::Uint16,
                Kind::Int64,
                Kind::Float,
                Kind::Double,
                Kind::String,
                Kind::Handle,
                Kind::MessagePipe,
                Kind::DataPipeConsumer,
                Kind::SharedBuffer,
            ]),
            prop::sample::select(decls),
        ];
        leaf.prop_recursive(3, 24, 2, move |inner| {
            prop_oneof![
                inner.clone().prop_map(Kind::array),
                (inner.clone(), 1u32..8).prop_map(|(k, n)| Kind::fixed_array(k, n)),
                (prop::sample::select(map_keys.clone()), inner.clone())
                    .prop_map(|(k, v)| Kind::map(k, v)),
                inner.prop_map(|k| if k.is_reference() { Kind::nullable(k) } else { k }),
            ]
        })
        .boxed()
    }

    fn attributes_strategy() -> impl Strategy<Value = Attributes> {
        let value = prop_oneof![
            any::<bool>().prop_map(AttributeValue::Bool),
            any::<i64>().prop_map(AttributeValue::Int),
            "[a-z.]{0,6}".prop_map(AttributeValue::String),
        ];
        prop::collection::vec(("[A-Z][a-z]{0,4}", value), 0..3)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    fn constants_strategy(color: DeclRef) -> impl Strategy<Value = Vec<Constant>> {
        let value = prop_oneof![
            any::<bool>().prop_map(|b| (Kind::Bool, Value::Bool(b))),
            any::<i64>().prop_map(|n| (Kind::Int64, Value::Int(n))),
            (-1e300f64..1e300).prop_map(|x| (Kind::Double, Value::Float(x))),
            "[a-z \"]{0,8}".prop_map(|s| (Kind::String, Value::String(s))),
            prop::sample::select(vec![("RED", 0i64), ("BLUE", 7)]).prop_map(move |(label, value)| {
                let value = Value::Enum {
                    kind: color.clone(),
                    label: label.to_string(),
                    value,
                };
                (Kind::Enum(color.clone()), value)
            }),
        ];
        prop::collection::vec(value, 0..5).prop_map(|values| {
            values
                .into_iter()
                .enumerate()
                .map(|(i, (kind, value))| Constant::new(format!("k{}", i), kind, value))
                .collect()
        })
    }

    fn module_strategy() -> impl Strategy<Value = Module> {
        prop::sample::select(vec!["", "app", "shared"]).prop_flat_map(|namespace| {
            let skeleton = skeleton(namespace);
            let kinds = kind_strategy(visible_kinds(&skeleton));
            let color = skeleton.imports[0].decl_ref("Color");
            (
                Just(skeleton),
                prop::collection::vec(kinds.clone(), 0..6),
                prop::collection::vec(kinds.clone(), 0..4),
                prop::collection::vec(kinds.clone(), 0..4),
                prop::option::of(prop::collection::vec(kinds, 0..3)),
                prop::option::of(-1e10f64..1e10),
                any::<bool>(),
                any::<bool>(),
                constants_strategy(color),
                attributes_strategy(),
            )
                .prop_map(
                    |(mut module, fields, variants, params, response, ratio, origin, client, constants, attributes)| {
                        let mode = module.decl_ref("Holder.Mode");
                        let point = module.imports[0].decl_ref("Point");

                        let holder = &mut module.structs[0];
                        holder.attributes = attributes.clone();
                        for (i, kind) in fields.into_iter().enumerate() {
                            holder.fields.push(Field::new(format!("f{}", i), kind, Some(i as u32)));
                        }
                        let next = holder.fields.len() as u32;
                        holder.fields.push(
                            Field::new("mode", Kind::Enum(mode.clone()), Some(next)).with_default(
                                Value::Enum {
                                    kind: mode,
                                    label: "ON".into(),
                                    value: 1,
                                },
                            ),
                        );
                        let mut ratio_field = Field::new("ratio", Kind::Double, Some(next + 1));
                        ratio_field.default_value = ratio.map(Value::Float);
                        holder.fields.push(ratio_field);
                        let mut origin_field = Field::new("origin", Kind::Struct(point), Some(next + 2));
                        origin_field.default_value = origin.then_some(Value::Default);
                        holder.fields.push(origin_field);

                        for (i, kind) in variants.into_iter().enumerate() {
                            module.unions[0]
                                .fields
                                .push(Field::new(format!("v{}", i), kind, Some(i as u32)));
                        }

                        let sink = &mut module.interfaces[0];
                        sink.client = client.then(|| "Canvas".to_string());
                        let mut method = Method::new("Send", 0);
                        method.attributes = attributes;
                        for (i, kind) in params.into_iter().enumerate() {
                            method.parameters.push(Parameter::new(format!("p{}", i), kind, i as u32));
                        }
                        method.response_parameters = response.map(|kinds| {
                            kinds
                                .into_iter()
                                .enumerate()
                                .map(|(i, kind)| Parameter::new(format!("r{}", i), kind, i as u32))
                                .collect()
                        });
                        sink.methods.push(method);

                        module.constants = constants;
                        module
                    },
                )
        })
    }

    proptest! {
        #[test]
        fn prop_module_data_round_trip(module in module_strategy()) {
            let decoded = module_from_data(&module_to_data(&module));
            prop_assert_eq!(decoded, Ok(module));
        }
    }
}
