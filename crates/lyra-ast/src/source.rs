use super::loc::Location;
use enum_as_inner::EnumAsInner;
use lyra_heap::{Heap, PStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id {
  pub loc: Location,
  pub name: PStr,
}

impl Id {
  pub fn from(name: PStr) -> Id {
    Id { loc: Location::dummy(), name }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
  Bool(bool),
  Number(f64),
  String(PStr),
}

impl Literal {
  /// Source form of the literal, used as the canonical text of literal patterns.
  pub fn pretty_print(&self, heap: &Heap) -> String {
    match self {
      Self::Bool(b) => b.to_string(),
      Self::Number(n) => n.to_string(),
      Self::String(s) => format!("\"{}\"", s.as_str(heap)),
    }
  }
}

pub mod annotation {
  use super::super::loc::Location;
  use enum_as_inner::EnumAsInner;
  use lyra_heap::PStr;

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub enum PrimitiveTypeKind {
    String,
    Number,
    Boolean,
    Unit,
    Unknown,
  }

  /// A named type reference: type parameter, alias, ADT, `Array<T>` or `Element<Props>`.
  #[derive(Debug, Clone, PartialEq)]
  pub struct Id {
    pub location: Location,
    pub id: super::Id,
    pub type_arguments: Vec<T>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Function {
    pub location: Location,
    pub parameters: Vec<T>,
    pub return_type: Box<T>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct RecordField {
    pub name: super::Id,
    pub optional: bool,
    pub annotation: T,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Record {
    pub location: Location,
    pub fields: Vec<RecordField>,
  }

  #[derive(Debug, Clone, PartialEq, EnumAsInner)]
  pub enum T {
    Primitive(Location, PrimitiveTypeKind),
    Id(self::Id),
    Fn(Function),
    Record(Record),
    Tuple(Location, Vec<T>),
    Array(Location, Box<T>),
    StringLiteral(Location, PStr),
    LiteralUnion(Location, Vec<PStr>),
  }

  impl T {
    pub fn location(&self) -> Location {
      match self {
        T::Primitive(l, _)
        | T::Tuple(l, _)
        | T::Array(l, _)
        | T::StringLiteral(l, _)
        | T::LiteralUnion(l, _) => *l,
        T::Id(annot) => annot.location,
        T::Fn(annot) => annot.location,
        T::Record(annot) => annot.location,
      }
    }
  }
}

/// Left-hand sides of `let`/`const` bindings.
pub mod pattern {
  use super::{super::loc::Location, Id};

  #[derive(Debug, Clone, PartialEq)]
  pub struct ObjectPatternField {
    pub loc: Location,
    pub field_name: Id,
    /// `{ a: b }` binds `b`. `None` is the `{ a }` shorthand.
    pub alias: Option<Id>,
  }

  impl ObjectPatternField {
    pub fn bound_name(&self) -> Id {
      self.alias.unwrap_or(self.field_name)
    }
  }

  #[derive(Debug, Clone, PartialEq)]
  pub enum Binding {
    Id(Id),
    Object(Location, Vec<ObjectPatternField>),
    Array(Location, Vec<Id>),
  }

  impl Binding {
    pub fn loc(&self) -> Location {
      match self {
        Binding::Id(id) => id.loc,
        Binding::Object(loc, _) | Binding::Array(loc, _) => *loc,
      }
    }

    pub fn bound_names(&self) -> Vec<Id> {
      match self {
        Binding::Id(id) => vec![*id],
        Binding::Object(_, fields) => fields.iter().map(ObjectPatternField::bound_name).collect(),
        Binding::Array(_, names) => names.clone(),
      }
    }
  }
}

/// Patterns of `match` arms.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum MatchingPattern {
  Literal(Location, Literal),
  Wildcard(Location),
  Id(Id),
  Constructor { loc: Location, name: Id, argument: Option<Box<MatchingPattern>> },
}

impl MatchingPattern {
  pub fn loc(&self) -> Location {
    match self {
      Self::Literal(loc, _) | Self::Wildcard(loc) | Self::Constructor { loc, .. } => *loc,
      Self::Id(id) => id.loc,
    }
  }
}

pub mod expr {
  use super::{super::loc::Location, annotation, Id, Literal, MatchingPattern, Statement};
  use enum_as_inner::EnumAsInner;

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub struct ExpressionCommon {
    pub loc: Location,
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub enum UnaryOperator {
    NOT,
    NEG,
  }

  impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
      match self {
        Self::NOT => "!",
        Self::NEG => "-",
      }
    }
  }

  #[derive(Debug, Clone, Copy, PartialEq, Eq)]
  pub enum BinaryOperator {
    MUL,
    DIV,
    MOD,
    PLUS,
    MINUS,
    LT,
    LE,
    GT,
    GE,
    EQ,
    NE,
    AND,
    OR,
  }

  impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
      match self {
        Self::MUL => "*",
        Self::DIV => "/",
        Self::MOD => "%",
        Self::PLUS => "+",
        Self::MINUS => "-",
        Self::LT => "<",
        Self::LE => "<=",
        Self::GT => ">",
        Self::GE => ">=",
        Self::EQ => "==",
        Self::NE => "!=",
        Self::AND => "&&",
        Self::OR => "||",
      }
    }
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct RecordField {
    pub name: Id,
    /// `None` is the `{ a }` shorthand that reads the variable `a`.
    pub value: Option<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct FunctionParameter {
    pub name: Id,
    pub annotation: Option<annotation::T>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Function {
    pub common: ExpressionCommon,
    pub type_parameters: Vec<Id>,
    pub parameters: Vec<FunctionParameter>,
    pub return_annotation: Option<annotation::T>,
    pub body: Box<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Call {
    pub common: ExpressionCommon,
    pub callee: Box<E>,
    pub arguments: Vec<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct FieldAccess {
    pub common: ExpressionCommon,
    pub object: Box<E>,
    pub field_name: Id,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Index {
    pub common: ExpressionCommon,
    pub object: Box<E>,
    pub index: Box<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Unary {
    pub common: ExpressionCommon,
    pub operator: UnaryOperator,
    pub argument: Box<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Binary {
    pub common: ExpressionCommon,
    pub operator: BinaryOperator,
    pub e1: Box<E>,
    pub e2: Box<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct IfElse {
    pub common: ExpressionCommon,
    pub condition: Box<E>,
    pub e1: Box<E>,
    pub e2: Option<Box<E>>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct MatchCase {
    pub loc: Location,
    pub pattern: MatchingPattern,
    pub body: Box<E>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Match {
    pub common: ExpressionCommon,
    pub matched: Box<E>,
    pub cases: Vec<MatchCase>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct Block {
    pub common: ExpressionCommon,
    pub statements: Vec<Statement>,
    pub expression: Option<Box<E>>,
  }

  #[derive(Debug, Clone, PartialEq)]
  pub struct ElementAttribute {
    pub name: Id,
    /// `None` is a bare attribute such as `<input disabled />`.
    pub value: Option<E>,
  }

  /// A templating element, `<tag attr={value}>{children}</tag>`.
  #[derive(Debug, Clone, PartialEq)]
  pub struct Element {
    pub common: ExpressionCommon,
    pub tag: Id,
    pub attributes: Vec<ElementAttribute>,
    pub children: Vec<E>,
  }

  #[derive(Debug, Clone, PartialEq, EnumAsInner)]
  pub enum E {
    Literal(ExpressionCommon, Literal),
    Id(ExpressionCommon, Id),
    Parenthesized(ExpressionCommon, Box<E>),
    Record(ExpressionCommon, Vec<RecordField>),
    Array(ExpressionCommon, Vec<E>),
    Block(Block),
    IfElse(IfElse),
    Function(Function),
    Match(Match),
    Call(Call),
    FieldAccess(FieldAccess),
    Index(Index),
    Unary(Unary),
    Binary(Binary),
    Element(Element),
  }

  impl E {
    pub fn common(&self) -> &ExpressionCommon {
      match self {
        E::Literal(common, _)
        | E::Id(common, _)
        | E::Parenthesized(common, _)
        | E::Record(common, _)
        | E::Array(common, _) => common,
        E::Block(e) => &e.common,
        E::IfElse(e) => &e.common,
        E::Function(e) => &e.common,
        E::Match(e) => &e.common,
        E::Call(e) => &e.common,
        E::FieldAccess(e) => &e.common,
        E::Index(e) => &e.common,
        E::Unary(e) => &e.common,
        E::Binary(e) => &e.common,
        E::Element(e) => &e.common,
      }
    }

    pub fn loc(&self) -> Location {
      self.common().loc
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
  pub loc: Location,
  pub binding: pattern::Binding,
  pub annotation: Option<annotation::T>,
  pub assigned_expression: expr::E,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDefinition {
  pub loc: Location,
  pub name: Id,
  pub payload: Option<annotation::T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinitionBody {
  Alias(annotation::T),
  Sum(Vec<VariantDefinition>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
  pub loc: Location,
  pub name: Id,
  pub type_parameters: Vec<Id>,
  pub body: TypeDefinitionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
  pub loc: Location,
  pub imported_members: Vec<Id>,
  /// The literal path text, e.g. `./utils`.
  pub path: Id,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Statement {
  Assignment(Assignment),
  TypeDefinition(TypeDefinition),
  Import(Import),
  Export(Location, Box<Statement>),
  ExportNames(Location, Vec<Id>),
  Expression(expr::E),
}

impl Statement {
  pub fn loc(&self) -> Location {
    match self {
      Statement::Assignment(s) => s.loc,
      Statement::TypeDefinition(s) => s.loc,
      Statement::Import(s) => s.loc,
      Statement::Export(loc, _) | Statement::ExportNames(loc, _) => *loc,
      Statement::Expression(e) => e.loc(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
  pub statements: Vec<Statement>,
}

/// Builds syntax trees without a parser. Every node receives a fresh location so that it has a
/// distinct identity, exactly as parsed nodes do.
pub mod test_builder {
  use super::*;
  use crate::loc::{Location, Position};
  use lyra_heap::ModuleReference;
  use std::cell::{Cell, RefCell};

  pub struct AstBuilder<'a> {
    heap: RefCell<&'a mut Heap>,
    module_reference: ModuleReference,
    next_line: Cell<u32>,
  }

  impl<'a> AstBuilder<'a> {
    pub fn new(heap: &'a mut Heap, module_reference: ModuleReference) -> AstBuilder<'a> {
      AstBuilder { heap: RefCell::new(heap), module_reference, next_line: Cell::new(0) }
    }

    pub fn loc(&self) -> Location {
      let line = self.next_line.get();
      self.next_line.set(line + 1);
      Location {
        module_reference: self.module_reference,
        start: Position(line, 0),
        end: Position(line, 1),
      }
    }

    fn common(&self) -> expr::ExpressionCommon {
      expr::ExpressionCommon { loc: self.loc() }
    }

    pub fn str(&self, s: &str) -> PStr {
      self.heap.borrow_mut().alloc_string(s.to_string())
    }

    pub fn id(&self, name: &str) -> Id {
      Id { loc: self.loc(), name: self.str(name) }
    }

    // Annotations

    fn primitive_annot(&self, kind: annotation::PrimitiveTypeKind) -> annotation::T {
      annotation::T::Primitive(self.loc(), kind)
    }

    pub fn string_annot(&self) -> annotation::T {
      self.primitive_annot(annotation::PrimitiveTypeKind::String)
    }

    pub fn number_annot(&self) -> annotation::T {
      self.primitive_annot(annotation::PrimitiveTypeKind::Number)
    }

    pub fn boolean_annot(&self) -> annotation::T {
      self.primitive_annot(annotation::PrimitiveTypeKind::Boolean)
    }

    pub fn unit_annot(&self) -> annotation::T {
      self.primitive_annot(annotation::PrimitiveTypeKind::Unit)
    }

    pub fn unknown_annot(&self) -> annotation::T {
      self.primitive_annot(annotation::PrimitiveTypeKind::Unknown)
    }

    pub fn id_annot(&self, name: &str, type_arguments: Vec<annotation::T>) -> annotation::T {
      annotation::T::Id(annotation::Id { location: self.loc(), id: self.id(name), type_arguments })
    }

    pub fn simple_id_annot(&self, name: &str) -> annotation::T {
      self.id_annot(name, vec![])
    }

    pub fn fn_annot(
      &self,
      parameters: Vec<annotation::T>,
      return_type: annotation::T,
    ) -> annotation::T {
      annotation::T::Fn(annotation::Function {
        location: self.loc(),
        parameters,
        return_type: Box::new(return_type),
      })
    }

    /// Fields are `(name, optional, annotation)`.
    pub fn record_annot(&self, fields: Vec<(&str, bool, annotation::T)>) -> annotation::T {
      annotation::T::Record(annotation::Record {
        location: self.loc(),
        fields: fields
          .into_iter()
          .map(|(name, optional, annotation)| annotation::RecordField {
            name: self.id(name),
            optional,
            annotation,
          })
          .collect(),
      })
    }

    pub fn tuple_annot(&self, elements: Vec<annotation::T>) -> annotation::T {
      annotation::T::Tuple(self.loc(), elements)
    }

    pub fn array_annot(&self, element: annotation::T) -> annotation::T {
      annotation::T::Array(self.loc(), Box::new(element))
    }

    pub fn string_literal_annot(&self, value: &str) -> annotation::T {
      annotation::T::StringLiteral(self.loc(), self.str(value))
    }

    pub fn literal_union_annot(&self, values: &[&str]) -> annotation::T {
      annotation::T::LiteralUnion(self.loc(), values.iter().map(|v| self.str(v)).collect())
    }

    // Expressions

    pub fn number(&self, n: f64) -> expr::E {
      expr::E::Literal(self.common(), Literal::Number(n))
    }

    pub fn string(&self, s: &str) -> expr::E {
      expr::E::Literal(self.common(), Literal::String(self.str(s)))
    }

    pub fn boolean(&self, b: bool) -> expr::E {
      expr::E::Literal(self.common(), Literal::Bool(b))
    }

    pub fn var(&self, name: &str) -> expr::E {
      expr::E::Id(self.common(), self.id(name))
    }

    pub fn paren(&self, e: expr::E) -> expr::E {
      expr::E::Parenthesized(self.common(), Box::new(e))
    }

    pub fn record(&self, fields: Vec<(&str, expr::E)>) -> expr::E {
      expr::E::Record(
        self.common(),
        fields
          .into_iter()
          .map(|(name, value)| expr::RecordField { name: self.id(name), value: Some(value) })
          .collect(),
      )
    }

    pub fn record_shorthand(&self, names: &[&str]) -> expr::E {
      expr::E::Record(
        self.common(),
        names.iter().map(|name| expr::RecordField { name: self.id(name), value: None }).collect(),
      )
    }

    pub fn array(&self, elements: Vec<expr::E>) -> expr::E {
      expr::E::Array(self.common(), elements)
    }

    pub fn block(&self, statements: Vec<Statement>, expression: Option<expr::E>) -> expr::E {
      expr::E::Block(expr::Block {
        common: self.common(),
        statements,
        expression: expression.map(Box::new),
      })
    }

    pub fn if_else(&self, condition: expr::E, e1: expr::E, e2: Option<expr::E>) -> expr::E {
      expr::E::IfElse(expr::IfElse {
        common: self.common(),
        condition: Box::new(condition),
        e1: Box::new(e1),
        e2: e2.map(Box::new),
      })
    }

    pub fn function(
      &self,
      type_parameters: &[&str],
      parameters: Vec<(&str, Option<annotation::T>)>,
      return_annotation: Option<annotation::T>,
      body: expr::E,
    ) -> expr::E {
      expr::E::Function(expr::Function {
        common: self.common(),
        type_parameters: type_parameters.iter().map(|n| self.id(n)).collect(),
        parameters: parameters
          .into_iter()
          .map(|(name, annotation)| expr::FunctionParameter { name: self.id(name), annotation })
          .collect(),
        return_annotation,
        body: Box::new(body),
      })
    }

    /// Shorthand for an unannotated, non-generic function.
    pub fn lambda(&self, parameters: &[&str], body: expr::E) -> expr::E {
      self.function(&[], parameters.iter().map(|p| (*p, None)).collect(), None, body)
    }

    pub fn call(&self, callee: expr::E, arguments: Vec<expr::E>) -> expr::E {
      expr::E::Call(expr::Call { common: self.common(), callee: Box::new(callee), arguments })
    }

    pub fn field(&self, object: expr::E, field_name: &str) -> expr::E {
      expr::E::FieldAccess(expr::FieldAccess {
        common: self.common(),
        object: Box::new(object),
        field_name: self.id(field_name),
      })
    }

    pub fn index(&self, object: expr::E, index: expr::E) -> expr::E {
      expr::E::Index(expr::Index {
        common: self.common(),
        object: Box::new(object),
        index: Box::new(index),
      })
    }

    pub fn unary(&self, operator: expr::UnaryOperator, argument: expr::E) -> expr::E {
      expr::E::Unary(expr::Unary { common: self.common(), operator, argument: Box::new(argument) })
    }

    pub fn binary(&self, operator: expr::BinaryOperator, e1: expr::E, e2: expr::E) -> expr::E {
      expr::E::Binary(expr::Binary {
        common: self.common(),
        operator,
        e1: Box::new(e1),
        e2: Box::new(e2),
      })
    }

    pub fn match_(&self, matched: expr::E, cases: Vec<(MatchingPattern, expr::E)>) -> expr::E {
      expr::E::Match(expr::Match {
        common: self.common(),
        matched: Box::new(matched),
        cases: cases
          .into_iter()
          .map(|(pattern, body)| expr::MatchCase { loc: self.loc(), pattern, body: Box::new(body) })
          .collect(),
      })
    }

    pub fn element(
      &self,
      tag: &str,
      attributes: Vec<(&str, Option<expr::E>)>,
      children: Vec<expr::E>,
    ) -> expr::E {
      expr::E::Element(expr::Element {
        common: self.common(),
        tag: self.id(tag),
        attributes: attributes
          .into_iter()
          .map(|(name, value)| expr::ElementAttribute { name: self.id(name), value })
          .collect(),
        children,
      })
    }

    // Matching patterns

    pub fn wildcard_pattern(&self) -> MatchingPattern {
      MatchingPattern::Wildcard(self.loc())
    }

    pub fn id_pattern(&self, name: &str) -> MatchingPattern {
      MatchingPattern::Id(self.id(name))
    }

    pub fn bool_pattern(&self, b: bool) -> MatchingPattern {
      MatchingPattern::Literal(self.loc(), Literal::Bool(b))
    }

    pub fn number_pattern(&self, n: f64) -> MatchingPattern {
      MatchingPattern::Literal(self.loc(), Literal::Number(n))
    }

    pub fn string_pattern(&self, s: &str) -> MatchingPattern {
      MatchingPattern::Literal(self.loc(), Literal::String(self.str(s)))
    }

    pub fn ctor_pattern(&self, name: &str, argument: Option<MatchingPattern>) -> MatchingPattern {
      MatchingPattern::Constructor {
        loc: self.loc(),
        name: self.id(name),
        argument: argument.map(Box::new),
      }
    }

    // Statements

    pub fn let_(&self, name: &str, annotation: Option<annotation::T>, e: expr::E) -> Statement {
      Statement::Assignment(Assignment {
        loc: self.loc(),
        binding: pattern::Binding::Id(self.id(name)),
        annotation,
        assigned_expression: e,
      })
    }

    /// Fields are `(field name, optional alias)`.
    pub fn let_object(
      &self,
      fields: Vec<(&str, Option<&str>)>,
      annotation: Option<annotation::T>,
      e: expr::E,
    ) -> Statement {
      let binding = pattern::Binding::Object(
        self.loc(),
        fields
          .into_iter()
          .map(|(name, alias)| pattern::ObjectPatternField {
            loc: self.loc(),
            field_name: self.id(name),
            alias: alias.map(|a| self.id(a)),
          })
          .collect(),
      );
      Statement::Assignment(Assignment {
        loc: self.loc(),
        binding,
        annotation,
        assigned_expression: e,
      })
    }

    pub fn let_array(
      &self,
      names: &[&str],
      annotation: Option<annotation::T>,
      e: expr::E,
    ) -> Statement {
      let binding =
        pattern::Binding::Array(self.loc(), names.iter().map(|n| self.id(n)).collect());
      Statement::Assignment(Assignment {
        loc: self.loc(),
        binding,
        annotation,
        assigned_expression: e,
      })
    }

    pub fn type_alias(&self, name: &str, type_parameters: &[&str], t: annotation::T) -> Statement {
      Statement::TypeDefinition(TypeDefinition {
        loc: self.loc(),
        name: self.id(name),
        type_parameters: type_parameters.iter().map(|n| self.id(n)).collect(),
        body: TypeDefinitionBody::Alias(t),
      })
    }

    pub fn sum_type(
      &self,
      name: &str,
      type_parameters: &[&str],
      variants: Vec<(&str, Option<annotation::T>)>,
    ) -> Statement {
      Statement::TypeDefinition(TypeDefinition {
        loc: self.loc(),
        name: self.id(name),
        type_parameters: type_parameters.iter().map(|n| self.id(n)).collect(),
        body: TypeDefinitionBody::Sum(
          variants
            .into_iter()
            .map(|(name, payload)| VariantDefinition {
              loc: self.loc(),
              name: self.id(name),
              payload,
            })
            .collect(),
        ),
      })
    }

    pub fn import(&self, members: &[&str], path: &str) -> Statement {
      Statement::Import(Import {
        loc: self.loc(),
        imported_members: members.iter().map(|m| self.id(m)).collect(),
        path: self.id(path),
      })
    }

    pub fn export(&self, statement: Statement) -> Statement {
      Statement::Export(self.loc(), Box::new(statement))
    }

    pub fn export_names(&self, names: &[&str]) -> Statement {
      Statement::ExportNames(self.loc(), names.iter().map(|n| self.id(n)).collect())
    }

    pub fn expression_statement(&self, e: expr::E) -> Statement {
      Statement::Expression(e)
    }

    pub fn module(&self, statements: Vec<Statement>) -> Module {
      Module { statements }
    }
  }
}
