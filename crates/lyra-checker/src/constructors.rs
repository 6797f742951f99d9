use super::{
  instantiation::{self, TypeVariableGenerator},
  type_::{FunctionType, Type, TypeVariable},
};
use lyra_ast::Location;
use lyra_heap::PStr;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ConstructorDefinition {
  pub adt_name: PStr,
  pub name: PStr,
  /// Zero parameters for nullary variants, exactly one otherwise. Returns the ADT instance type.
  pub type_: FunctionType,
  pub loc: Location,
}

impl ConstructorDefinition {
  pub fn is_nullary(&self) -> bool {
    self.type_.parameter_types.is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct AdtDefinition {
  pub name: PStr,
  pub type_parameters: Vec<TypeVariable>,
  pub loc: Location,
}

impl AdtDefinition {
  /// `Adt(name)` when not generic, otherwise the instance over its own type parameters.
  pub fn instance_type(&self) -> Rc<Type> {
    if self.type_parameters.is_empty() {
      Rc::new(Type::Adt(self.name))
    } else {
      Rc::new(Type::Generic(
        self.name,
        self.type_parameters.iter().map(|v| Rc::new(Type::Var(*v))).collect(),
      ))
    }
  }
}

/// Append-only table of every ADT and constructor visible in one module.
#[derive(Debug, Clone)]
pub struct ConstructorCatalog {
  adts: Vec<AdtDefinition>,
  constructors: Vec<ConstructorDefinition>,
}

impl ConstructorCatalog {
  /// The catalog with `Option<T> = Some(T) | None` and `Result<T, E> = Ok(T) | Err(E)`.
  pub fn with_builtins(generator: &mut TypeVariableGenerator) -> ConstructorCatalog {
    let mut catalog = ConstructorCatalog { adts: vec![], constructors: vec![] };
    let option_t = generator.fresh(PStr::UPPER_T);
    catalog.adts.push(AdtDefinition {
      name: PStr::OPTION,
      type_parameters: vec![option_t],
      loc: Location::dummy(),
    });
    catalog.push_variant(PStr::OPTION, PStr::SOME, Some(Rc::new(Type::Var(option_t))));
    catalog.push_variant(PStr::OPTION, PStr::NONE, None);
    let result_t = generator.fresh(PStr::UPPER_T);
    let result_e = generator.fresh(PStr::UPPER_E);
    catalog.adts.push(AdtDefinition {
      name: PStr::RESULT,
      type_parameters: vec![result_t, result_e],
      loc: Location::dummy(),
    });
    catalog.push_variant(PStr::RESULT, PStr::OK, Some(Rc::new(Type::Var(result_t))));
    catalog.push_variant(PStr::RESULT, PStr::ERR, Some(Rc::new(Type::Var(result_e))));
    catalog
  }

  fn push_variant(&mut self, adt_name: PStr, name: PStr, payload: Option<Rc<Type>>) {
    self.push_variant_at(adt_name, name, payload, Location::dummy());
  }

  fn push_variant_at(
    &mut self,
    adt_name: PStr,
    name: PStr,
    payload: Option<Rc<Type>>,
    loc: Location,
  ) {
    let return_type = match self.find_adt(adt_name) {
      Some(adt) => adt.instance_type(),
      None => Rc::new(Type::Adt(adt_name)),
    };
    self.constructors.push(ConstructorDefinition {
      adt_name,
      name,
      type_: FunctionType {
        parameter_types: payload.into_iter().collect(),
        return_type,
        constructor_name: Some(name),
      },
      loc,
    });
  }

  pub fn adts(&self) -> &[AdtDefinition] {
    &self.adts
  }

  pub fn constructors(&self) -> &[ConstructorDefinition] {
    &self.constructors
  }

  pub fn find_adt(&self, name: PStr) -> Option<&AdtDefinition> {
    self.adts.iter().find(|adt| adt.name == name)
  }

  pub fn find(&self, name: PStr) -> Option<&ConstructorDefinition> {
    self.constructors.iter().find(|c| c.name == name)
  }

  pub fn variants_of(&self, adt_name: PStr) -> impl Iterator<Item = &ConstructorDefinition> {
    self.constructors.iter().filter(move |c| c.adt_name == adt_name)
  }

  /// Rejects a second ADT of the same name, returning the existing one's location.
  pub fn add_adt(&mut self, adt: AdtDefinition) -> Result<(), Location> {
    if let Some(existing) = self.find_adt(adt.name) {
      return Err(existing.loc);
    }
    self.adts.push(adt);
    Ok(())
  }

  /// Adds a variant of an already registered ADT. A constructor name can only be used once.
  pub fn add_variant(
    &mut self,
    adt_name: PStr,
    name: PStr,
    payload: Option<Rc<Type>>,
    loc: Location,
  ) -> Result<(), Location> {
    if let Some(existing) = self.find(name) {
      return Err(existing.loc);
    }
    self.push_variant_at(adt_name, name, payload, loc);
    Ok(())
  }

  /// Imports a definition checked in another module. Conflicts keep the existing entry.
  pub fn add_definition(&mut self, definition: ConstructorDefinition) -> Result<(), Location> {
    if let Some(existing) = self.find(definition.name) {
      return Err(existing.loc);
    }
    self.constructors.push(definition);
    Ok(())
  }

  fn type_parameters_of(&self, adt_name: PStr) -> &[TypeVariable] {
    self.find_adt(adt_name).map(|adt| adt.type_parameters.as_slice()).unwrap_or(&[])
  }

  /// The constructor's function type with fresh variables for the ADT's type parameters.
  pub fn instantiate_constructor(
    &self,
    definition: &ConstructorDefinition,
    generator: &mut TypeVariableGenerator,
  ) -> FunctionType {
    instantiation::instantiate_fn(
      &definition.type_,
      self.type_parameters_of(definition.adt_name),
      generator,
    )
  }

  /// What an identifier naming the constructor means as a value: the instance type for nullary
  /// variants, the function type otherwise.
  pub fn value_type(
    &self,
    definition: &ConstructorDefinition,
    generator: &mut TypeVariableGenerator,
  ) -> Rc<Type> {
    let f = self.instantiate_constructor(definition, generator);
    if definition.is_nullary() { f.return_type } else { Rc::new(Type::Fn(f)) }
  }
}
