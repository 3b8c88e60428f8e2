use askama::Template;

use crate::error::{GenError, Result};

/// Template data for one function: an impl item or a trait declaration
#[derive(Template)]
#[template(path = "fn.rs.txt", escape = "none")]
pub struct FnTemplateData {
    /// Marker line emitted above regenerable items
    pub marker: String,
    /// Emit the marker
    pub regenerable: bool,
    /// Doc comment lines, without the `///`
    pub doc: Vec<String>,
    /// Full signature without body or semicolon
    pub signature: String,
    /// Render as a trait declaration (`;` instead of a body)
    pub decl: bool,
    /// Body lines, already indented
    pub body: Vec<String>,
}

/// Template data for an `impl Trait for Type` block
#[derive(Template)]
#[template(path = "impl_block.rs.txt", escape = "none")]
pub struct ImplBlockTemplateData {
    /// Attributes above the block (`#[tonic::async_trait]`)
    pub attrs: Vec<String>,
    /// Trait path as written in the block header
    pub trait_path: String,
    /// Implementing type
    pub impl_name: String,
    /// Rendered methods, joined by blank lines
    pub methods: String,
}

/// Template data for a fresh implementation file
#[derive(Template)]
#[template(path = "svcimpl.rs.txt", escape = "none")]
pub struct SvcImplTemplateData {
    /// File marker line
    pub header: String,
    /// Rendered import block
    pub imports: String,
    /// Implementing type
    pub impl_name: String,
    /// Struct fields, `name: Type`
    pub fields: Vec<String>,
    /// Constructor parameter list
    pub ctor_params: String,
    /// Constructor field shorthand list
    pub ctor_fields: String,
    /// Rendered impl block
    pub impl_block: String,
    /// Extra items appended after the impl block
    pub extra_items: Vec<String>,
}

/// Template data for a service trait file
#[derive(Template)]
#[template(path = "svc.rs.txt", escape = "none")]
pub struct SvcTraitTemplateData {
    /// File marker line
    pub header: String,
    /// Rendered import block
    pub imports: String,
    /// Trait name
    pub name: String,
    /// Rendered declarations, joined by blank lines
    pub methods: String,
}

/// One struct field of a generated model or DTO
#[derive(Debug, Clone)]
pub struct FieldView {
    /// Column name
    pub column: String,
    /// Rust field identifier
    pub ident: String,
    /// Rust type
    pub ty: String,
    /// Field doc line
    pub doc: String,
}

/// Template data for a model file (`model/<table>.rs`)
#[derive(Template)]
#[template(path = "model.rs.txt", escape = "none")]
pub struct ModelTemplateData {
    pub header: String,
    pub imports: String,
    pub qualified: String,
    pub comment: String,
    pub struct_name: String,
    pub fields: Vec<FieldView>,
}

/// Template data for a DTO file (`dto/<table>.rs`)
#[derive(Template)]
#[template(path = "dto.rs.txt", escape = "none")]
pub struct DtoTemplateData {
    pub header: String,
    pub imports: String,
    pub comment: String,
    pub struct_name: String,
    pub fields: Vec<FieldView>,
}

/// Template data for a query file (`query/<table>.rs`)
#[derive(Template)]
#[template(path = "query.rs.txt", escape = "none")]
pub struct QueryTemplateData {
    pub header: String,
    pub imports: String,
    pub qualified: String,
    pub columns: String,
    pub struct_name: String,
    pub query_name: String,
    pub pool: String,
    pub count_sql: String,
    pub page_sql: String,
    pub has_pk: bool,
    pub pk_ident: String,
    pub pk_ty: String,
    /// The dialect returns the inserted key from the INSERT itself
    pub returning: bool,
    /// The key is assigned by the database rather than taken from the row
    pub pk_generated: bool,
    pub insert_sql: String,
    pub insert_binds: Vec<String>,
    pub find_sql: String,
    pub update_sql: String,
    pub update_binds: Vec<String>,
    pub delete_sql: String,
    pub delete_doc: String,
}

/// Template data for a `mod.rs` declaring one module per table
#[derive(Template)]
#[template(path = "mod.rs.txt", escape = "none")]
pub struct ModRsTemplateData {
    /// File marker line
    pub header: String,
    /// Module names to declare
    pub modules: Vec<String>,
    /// Rendered `pub use` block
    pub exports: String,
    /// Emit `DeletedAt` and `is_zero`
    pub model_helpers: bool,
    /// Emit `Parameter` and `Page<T>`
    pub dto_helpers: bool,
}

/// Render a fragment (no surrounding blank lines, no trailing newline)
pub fn render_fragment<T: Template>(name: &str, data: &T) -> Result<String> {
    let text = data.render().map_err(|e| GenError::render(name, e))?;
    Ok(text.trim_start_matches('\n').trim_end().to_string())
}

/// Render a whole file: no leading blank lines, exactly one trailing newline
pub fn render_file<T: Template>(name: &str, data: &T) -> Result<String> {
    let mut text = render_fragment(name, data)?;
    text.push('\n');
    Ok(text)
}
