#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{count, read, write, GREETER_SERVICE_YAML, GREETER_SVC};
use svcgen::generator::svcimpl::generate_rpc_impl;
use svcgen::generator::WriteOutcome;
use svcgen::meta::{load_document, ServiceMeta, StreamKind};

fn service(dir: &std::path::Path) -> ServiceMeta {
    let path = write(dir, "greeter.yaml", GREETER_SERVICE_YAML);
    load_document(&path).unwrap()
}

#[test]
fn test_service_document_loads() {
    let dir = tempfile::tempdir().unwrap();
    let meta = service(dir.path());
    assert_eq!(meta.name, "Greeter");
    let kinds: Vec<StreamKind> = meta.rpcs.iter().map(|r| r.stream).collect();
    assert_eq!(
        kinds,
        vec![
            StreamKind::Unary,
            StreamKind::BidiStream,
            StreamKind::ClientStream,
            StreamKind::ServerStream
        ]
    );
}

#[test]
fn test_stub_shapes_follow_streaming_kind() {
    let dir = tempfile::tempdir().unwrap();
    let meta = service(dir.path());
    let outcome = generate_rpc_impl(dir.path(), "GreeterImpl", None, &meta).unwrap();
    assert_eq!(outcome, WriteOutcome::Created);

    let text = read(dir.path(), "svcimpl.rs");
    assert!(syn::parse_file(&text).is_ok());

    // unary: request in, typed response or status out
    assert!(text.contains(
        "async fn say_hello(&self, request: Request<pb::HelloRequest>) -> Result<Response<pb::HelloReply>, Status> {"
    ));
    // bidi: one stream handle, error-only result
    assert!(text.contains(
        "async fn chat(&self, stream: pb::GreeterChatServer) -> Result<(), Status> {"
    ));
    assert!(text.contains(
        "async fn upload(&self, stream: pb::GreeterUploadServer) -> Result<(), Status> {"
    ));
    assert!(text.contains(
        "async fn watch(&self, request: pb::WatchRequest, stream: pb::GreeterWatchServer) -> Result<(), Status> {"
    ));
    assert_eq!(count(&text, "Err(Status::unimplemented(\"implement me\"))"), 4);

    assert!(text.contains("#[tonic::async_trait]\nimpl pb::GreeterServer for GreeterImpl {"));
    assert!(text.contains("impl pb::UnimplementedGreeterServer for GreeterImpl {"));
    assert!(text.contains("use crate::transport::grpc as pb;"));
}

#[test]
fn test_rpc_rerun_keeps_edits_and_adds_new_rpcs() {
    let dir = tempfile::tempdir().unwrap();
    let mut meta = service(dir.path());
    let last = meta.rpcs.pop().unwrap();
    generate_rpc_impl(dir.path(), "GreeterImpl", None, &meta).unwrap();

    let edited = read(dir.path(), "svcimpl.rs").replacen(
        "Err(Status::unimplemented(\"implement me\"))",
        "Ok(Response::new(pb::HelloReply::default()))",
        1,
    );
    write(dir.path(), "svcimpl.rs", &edited);

    meta.rpcs.push(last);
    generate_rpc_impl(dir.path(), "GreeterImpl", None, &meta).unwrap();
    let text = read(dir.path(), "svcimpl.rs");
    assert!(text.contains("Ok(Response::new(pb::HelloReply::default()))"));
    assert_eq!(count(&text, "async fn say_hello("), 1);
    assert_eq!(count(&text, "async fn watch("), 1);
    assert_eq!(count(&text, "impl pb::UnimplementedGreeterServer for GreeterImpl"), 1);

    assert_eq!(
        generate_rpc_impl(dir.path(), "GreeterImpl", None, &meta).unwrap(),
        WriteOutcome::Unchanged
    );
}

#[test]
fn test_plain_impl_is_retargeted_to_rpc_server() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "svc.rs", GREETER_SVC);
    write(
        dir.path(),
        "svcimpl.rs",
        "pub struct GreeterImpl;\n\nimpl Greeter for GreeterImpl {\n    fn hello(&self, name: String) -> String {\n        name\n    }\n}\n",
    );
    let meta = service(dir.path());
    generate_rpc_impl(dir.path(), "GreeterImpl", Some("Greeter"), &meta).unwrap();

    let text = read(dir.path(), "svcimpl.rs");
    assert!(!text.contains("impl Greeter for GreeterImpl"));
    assert!(text.contains("#[tonic::async_trait]\nimpl pb::GreeterServer for GreeterImpl {\n    fn hello(&self, name: String) -> String {\n        name\n    }"));
    assert_eq!(count(&text, "impl pb::GreeterServer for GreeterImpl"), 1);
}

#[test]
fn test_interface_impl_is_retargeted_when_service_name_differs() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "svcimpl.rs",
        "pub struct UserSvcImpl;\n\nimpl UserSvc for UserSvcImpl {\n    async fn say_hello(&self, request: Request<pb::HelloRequest>) -> Result<Response<pb::HelloReply>, Status> {\n        Ok(Response::new(pb::HelloReply::default()))\n    }\n}\n",
    );
    let yaml = "name: UserSvcService\nrpcs:\n  - name: SayHello\n    request: { name: HelloRequest }\n    response: { name: HelloReply }\n  - name: Bye\n    request: { name: ByeRequest }\n    response: { name: ByeReply }\n";
    let meta: ServiceMeta = load_document(&write(dir.path(), "user.yaml", yaml)).unwrap();

    generate_rpc_impl(dir.path(), "UserSvcImpl", Some("UserSvc"), &meta).unwrap();
    let text = read(dir.path(), "svcimpl.rs");
    assert!(syn::parse_file(&text).is_ok());
    assert_eq!(count(&text, "impl UserSvc for UserSvcImpl"), 0);
    assert_eq!(count(&text, "impl pb::UserSvcServiceServer for UserSvcImpl {"), 1);

    // both RPCs live in the one server impl, the hand-written body untouched
    let server = &text[text.find("impl pb::UserSvcServiceServer").unwrap()..];
    let server = &server[..server.find("\n}\n").unwrap()];
    assert!(server.contains("Ok(Response::new(pb::HelloReply::default()))"));
    assert_eq!(count(server, "async fn say_hello("), 1);
    assert_eq!(count(server, "async fn bye("), 1);
    assert_eq!(count(&text, "impl pb::UnimplementedUserSvcServiceServer for UserSvcImpl"), 1);
}
