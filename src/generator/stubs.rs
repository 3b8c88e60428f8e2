//! Structured function stubs.
//!
//! A [`FnStub`] is the in-memory form of one generated method. It renders as an impl
//! item (with a body) or as a trait declaration, optionally preceded by the
//! `DO NOT EDIT` marker that makes it regenerable.

use super::marker::DO_NOT_EDIT;
use super::naming::to_snake;
use super::templates::{render_fragment, FnTemplateData};
use crate::dummy_value::dummy_value;
use crate::error::Result;
use crate::meta::{FieldMeta, MethodMeta, RpcMeta, StreamKind};

const BODY_INDENT: &str = "        ";

/// One generated method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnStub {
    pub name: String,
    pub is_async: bool,
    /// Generic parameter list including angle brackets, or empty
    pub generics: String,
    /// Receiver text, empty for associated functions
    pub receiver: String,
    pub params: Vec<FieldMeta>,
    /// Return type, `None` for unit
    pub output: Option<String>,
    /// Where clause, or empty
    pub where_clause: String,
    pub doc: Vec<String>,
    /// Body lines relative to the function body, unindented
    pub body: Vec<String>,
    /// Preceded by the `DO NOT EDIT` marker and refreshed on every run
    pub regenerable: bool,
}

impl FnStub {
    /// Stub with a `&self` receiver and no parameters, output or body
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_async: false,
            generics: String::new(),
            receiver: "&self".to_string(),
            params: Vec::new(),
            output: None,
            where_clause: String::new(),
            doc: Vec::new(),
            body: Vec::new(),
            regenerable: false,
        }
    }

    /// Number of parameters, receiver excluded
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// `async fn name<G>(&self, a: A) -> Out where ...`
    pub fn signature(&self) -> String {
        let mut args: Vec<String> = Vec::with_capacity(self.params.len() + 1);
        if !self.receiver.is_empty() {
            args.push(self.receiver.clone());
        }
        args.extend(self.params.iter().map(|p| format!("{}: {}", p.name, p.ty)));

        let mut sig = String::new();
        if self.is_async {
            sig.push_str("async ");
        }
        sig.push_str("fn ");
        sig.push_str(&self.name);
        sig.push_str(&self.generics);
        sig.push('(');
        sig.push_str(&args.join(", "));
        sig.push(')');
        if let Some(output) = &self.output {
            sig.push_str(" -> ");
            sig.push_str(output);
        }
        if !self.where_clause.is_empty() {
            sig.push(' ');
            sig.push_str(&self.where_clause);
        }
        sig
    }

    fn template(&self, marker: bool, decl: bool) -> FnTemplateData {
        let body = if decl {
            Vec::new()
        } else {
            self.body
                .iter()
                .map(|line| {
                    if line.is_empty() {
                        String::new()
                    } else {
                        format!("{BODY_INDENT}{line}")
                    }
                })
                .collect()
        };
        FnTemplateData {
            marker: DO_NOT_EDIT.to_string(),
            regenerable: marker && self.regenerable,
            doc: self.doc.clone(),
            signature: self.signature(),
            decl,
            body,
        }
    }

    /// Impl item, indented one level, marker included when regenerable
    pub fn render(&self) -> Result<String> {
        render_fragment("fn", &self.template(true, false))
    }

    /// Impl item without the marker, used to refresh an item in place under its
    /// existing marker line
    pub fn render_unmarked(&self) -> Result<String> {
        Ok(render_fragment("fn", &self.template(false, false))?
            .trim_start()
            .to_string())
    }

    /// Trait declaration, indented one level, marker included when regenerable
    pub fn render_decl(&self) -> Result<String> {
        render_fragment("fn", &self.template(true, true))
    }

    /// Trait declaration without the marker
    pub fn render_decl_unmarked(&self) -> Result<String> {
        Ok(render_fragment("fn", &self.template(false, true))?
            .trim_start()
            .to_string())
    }
}

/// Render stubs as impl items separated by blank lines
pub fn render_items<'a>(stubs: impl IntoIterator<Item = &'a FnStub>) -> Result<String> {
    let rendered = stubs
        .into_iter()
        .map(FnStub::render)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("\n\n"))
}

/// Render stubs as trait declarations separated by blank lines
pub fn render_decls<'a>(stubs: impl IntoIterator<Item = &'a FnStub>) -> Result<String> {
    let rendered = stubs
        .into_iter()
        .map(FnStub::render_decl)
        .collect::<Result<Vec<_>>>()?;
    Ok(rendered.join("\n\n"))
}

/// Stub for a trait method: same signature, body returns placeholder values
pub fn method_stub(m: &MethodMeta) -> FnStub {
    let mut stub = FnStub::new(&m.name);
    stub.is_async = m.is_async;
    stub.generics = m.generics.clone().unwrap_or_default();
    stub.receiver = m.receiver.clone();
    stub.params = m.params.clone();
    stub.output = m.return_type();
    stub.where_clause = m.where_clause.clone().unwrap_or_default();
    stub.body = dummy_body(m);
    stub
}

fn dummy_body(m: &MethodMeta) -> Vec<String> {
    let data: Vec<&FieldMeta> = m.data_results().collect();
    let mut body: Vec<String> = data
        .iter()
        .map(|d| format!("let {}: {} = {};", d.name, d.ty, dummy_value(&d.ty)))
        .collect();

    let value = match data.as_slice() {
        [] => "()".to_string(),
        [single] => single.name.clone(),
        many => format!(
            "({})",
            many.iter().map(|d| d.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
    };
    match (m.error_type(), data.is_empty()) {
        (Some(_), _) => body.push(format!("Ok({value})")),
        (None, false) => body.push(value),
        (None, true) => {}
    }
    body
}

/// Generated name of the stream handle type for a streaming RPC
pub fn stream_type(service: &str, rpc: &RpcMeta) -> String {
    format!("pb::{service}{}Server", rpc.name)
}

/// Stub for one RPC, shaped by its streaming kind
///
/// Unary RPCs take the request and return the response; client and bidi streams take
/// only the stream handle; server streams take the request plus the handle. Every
/// body reports the method as unimplemented.
pub fn rpc_stub(service: &str, rpc: &RpcMeta) -> FnStub {
    let mut stub = FnStub::new(to_snake(&rpc.name));
    stub.is_async = true;
    let request = rpc.request.path();
    match rpc.stream {
        StreamKind::Unary => {
            stub.params
                .push(FieldMeta::new("request", format!("Request<{request}>")));
            stub.output = Some(format!(
                "Result<Response<{}>, Status>",
                rpc.response.path()
            ));
        }
        StreamKind::ClientStream | StreamKind::BidiStream => {
            stub.params
                .push(FieldMeta::new("stream", stream_type(service, rpc)));
            stub.output = Some("Result<(), Status>".to_string());
        }
        StreamKind::ServerStream => {
            stub.params.push(FieldMeta::new("request", request));
            stub.params
                .push(FieldMeta::new("stream", stream_type(service, rpc)));
            stub.output = Some("Result<(), Status>".to_string());
        }
    }
    stub.body = vec!["Err(Status::unimplemented(\"implement me\"))".to_string()];
    stub
}
