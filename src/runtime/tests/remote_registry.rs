//! `RemoteRepository` against an in-process registry speaking the OCI
//! distribution API over plain HTTP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use obom_core::config::RegistryConfig;
use obom_core::error::ObomError;
use obom_runtime::oci::{
    describe, pack_manifest, pack_referrer, parse_manifest, AttachmentSet, Credential, Descriptor,
    DescriptorExt, Digest, ImageReference, MediaType, MemoryStore, PackOptions, Publisher,
    ReferrerLister, RemoteRepository, StaticCredential, Target,
};
use obom_runtime::push::{push_sbom, PushRequest};
use obom_runtime::sbom::load_sbom_from_file;
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SBOM: &str = r#"{
    "SPDXID": "SPDXRef-DOCUMENT",
    "spdxVersion": "SPDX-2.3",
    "dataLicense": "CC0-1.0",
    "name": "remote-example",
    "documentNamespace": "https://example.com/spdx/remote",
    "creationInfo": {
        "created": "2024-01-02T03:04:05Z",
        "creators": ["Tool: obom"]
    }
}"#;

struct Request {
    method: String,
    target: String,
    content_type: String,
    body: Vec<u8>,
}

struct Response {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Response {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    fn error(status: u16, code: &str) -> Self {
        let envelope = json!({ "errors": [{ "code": code, "message": code.to_lowercase() }] });
        Self::new(status)
            .header("Content-Type", "application/json")
            .body(envelope.to_string().into_bytes())
    }

    fn encode(&self, head_only: bool) -> Vec<u8> {
        let reason = match self.status {
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            400 => "Bad Request",
            404 => "Not Found",
            _ => "Method Not Allowed",
        };
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.body.len()
        ));
        let mut bytes = out.into_bytes();
        if !head_only {
            bytes.extend_from_slice(&self.body);
        }
        bytes
    }
}

fn decode(value: &str) -> String {
    value
        .replace("%3A", ":")
        .replace("%3a", ":")
        .replace("%2F", "/")
        .replace("%2f", "/")
        .replace("%2B", "+")
        .replace("%2b", "+")
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| decode(v))
}

#[derive(Default)]
struct RegistryState {
    blobs: HashMap<String, Vec<u8>>,
    /// Tag or digest → (content type, bytes)
    manifests: HashMap<String, (String, Vec<u8>)>,
    uploads: HashMap<u32, Vec<u8>>,
    next_upload: u32,
    /// "METHOD /path" of every request, in arrival order
    log: Vec<String>,
}

impl RegistryState {
    fn handle(&mut self, request: &Request) -> Response {
        let (path, query) = request
            .target
            .split_once('?')
            .unwrap_or((request.target.as_str(), ""));
        self.log.push(format!("{} {}", request.method, path));

        if path == "/v2/" {
            return Response::new(200)
                .header("Content-Type", "application/json")
                .body(b"{}".to_vec());
        }
        let Some(rest) = path.strip_prefix("/v2/") else {
            return Response::error(404, "NAME_UNKNOWN");
        };

        if let Some((name, upload)) = rest.split_once("/blobs/uploads/") {
            return self.upload(request, name, upload, query);
        }
        if let Some((_, digest)) = rest.split_once("/blobs/") {
            return self.blob(&request.method, &decode(digest));
        }
        if let Some((name, reference)) = rest.split_once("/manifests/") {
            return self.manifest(request, name, &decode(reference));
        }
        if let Some((_, digest)) = rest.split_once("/referrers/") {
            return self.referrers(&decode(digest), query);
        }
        Response::error(404, "NAME_UNKNOWN")
    }

    fn upload(&mut self, request: &Request, name: &str, upload: &str, query: &str) -> Response {
        match request.method.as_str() {
            "POST" if upload.is_empty() => {
                self.next_upload += 1;
                let id = self.next_upload;
                self.uploads.insert(id, Vec::new());
                Response::new(202).header("Location", format!("/v2/{}/blobs/uploads/{}", name, id))
            }
            "PATCH" => {
                let Some(data) = upload.parse::<u32>().ok().and_then(|id| self.uploads.get_mut(&id)) else {
                    return Response::error(404, "BLOB_UPLOAD_UNKNOWN");
                };
                data.extend_from_slice(&request.body);
                Response::new(202).header("Location", format!("/v2/{}/blobs/uploads/{}", name, upload))
            }
            "PUT" => {
                let Some(mut data) = upload.parse::<u32>().ok().and_then(|id| self.uploads.remove(&id)) else {
                    return Response::error(404, "BLOB_UPLOAD_UNKNOWN");
                };
                data.extend_from_slice(&request.body);
                let Some(digest) = query_param(query, "digest") else {
                    return Response::error(400, "DIGEST_INVALID");
                };
                if Digest::from_bytes(&data).to_string() != digest {
                    return Response::error(400, "DIGEST_INVALID");
                }
                self.blobs.insert(digest.clone(), data);
                Response::new(201)
                    .header("Location", format!("/v2/{}/blobs/{}", name, digest))
                    .header("Docker-Content-Digest", digest)
            }
            _ => Response::error(405, "UNSUPPORTED"),
        }
    }

    fn blob(&self, method: &str, digest: &str) -> Response {
        match self.blobs.get(digest) {
            Some(data) if method == "GET" || method == "HEAD" => Response::new(200)
                .header("Content-Type", "application/octet-stream")
                .header("Docker-Content-Digest", digest)
                .body(data.clone()),
            None => Response::error(404, "BLOB_UNKNOWN"),
            Some(_) => Response::error(405, "UNSUPPORTED"),
        }
    }

    fn manifest(&mut self, request: &Request, name: &str, reference: &str) -> Response {
        match request.method.as_str() {
            "PUT" => {
                let digest = Digest::from_bytes(&request.body).to_string();
                if reference.starts_with("sha256:") && reference != digest {
                    return Response::error(400, "DIGEST_INVALID");
                }
                let entry = (request.content_type.clone(), request.body.clone());
                self.manifests.insert(digest.clone(), entry.clone());
                self.manifests.insert(reference.to_string(), entry);
                Response::new(201)
                    .header("Location", format!("/v2/{}/manifests/{}", name, digest))
                    .header("Docker-Content-Digest", digest)
            }
            "GET" | "HEAD" => match self.manifests.get(reference) {
                Some((content_type, body)) => Response::new(200)
                    .header("Content-Type", content_type.clone())
                    .header("Docker-Content-Digest", Digest::from_bytes(body).to_string())
                    .body(body.clone()),
                None => Response::error(404, "MANIFEST_UNKNOWN"),
            },
            _ => Response::error(405, "UNSUPPORTED"),
        }
    }

    fn referrers(&self, subject: &str, query: &str) -> Response {
        let wanted = query_param(query, "artifactType");
        let manifests: Vec<_> = self
            .manifests
            .iter()
            .filter(|(key, _)| key.starts_with("sha256:"))
            .filter_map(|(digest, (content_type, body))| {
                let manifest: serde_json::Value = serde_json::from_slice(body).ok()?;
                if manifest["subject"]["digest"] != subject {
                    return None;
                }
                let artifact_type = manifest["artifactType"].as_str()?.to_string();
                if wanted.as_deref().is_some_and(|w| w != artifact_type) {
                    return None;
                }
                Some(json!({
                    "mediaType": content_type,
                    "digest": digest,
                    "size": body.len(),
                    "artifactType": artifact_type,
                }))
            })
            .collect();

        let index = json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": manifests,
        });
        Response::new(200)
            .header("Content-Type", "application/vnd.oci.image.index.v1+json")
            .body(index.to_string().into_bytes())
    }
}

async fn serve(mut stream: TcpStream, state: Arc<Mutex<RegistryState>>) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    let mut content_type = String::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "content-type" => content_type = value.trim().to_string(),
                _ => {}
            }
        }
    }

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let head_only = method == "HEAD";
    let request = Request {
        method,
        target,
        content_type,
        body,
    };
    let response = state.lock().unwrap().handle(&request).encode(head_only);
    stream.write_all(&response).await?;
    stream.shutdown().await
}

struct MockRegistry {
    addr: SocketAddr,
    state: Arc<Mutex<RegistryState>>,
}

impl MockRegistry {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(RegistryState::default()));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    /// `localhost:<port>`, so the client picks plain HTTP.
    fn registry(&self) -> String {
        format!("localhost:{}", self.addr.port())
    }

    fn reference(&self, tag: &str) -> ImageReference {
        ImageReference::parse(&format!("{}/sbom:{}", self.registry(), tag)).unwrap()
    }

    fn repository(&self) -> RemoteRepository {
        let reference = self.reference("v1");
        let resolver = Arc::new(StaticCredential::new(&reference.registry, Credential::anonymous()));
        RemoteRepository::new(&reference, resolver, &RegistryConfig::default())
    }

    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().unwrap().log)
    }

    fn has_manifest(&self, reference: &str) -> bool {
        self.state.lock().unwrap().manifests.contains_key(reference)
    }
}

/// Manifest with one text layer, staged in `stage` and copied to `remote`
/// blob by blob, manifest last.
async fn upload_manifest(stage: &MemoryStore, remote: &RemoteRepository) -> Descriptor {
    let layer = describe(b"layer bytes", "text/plain");
    stage.push(&layer, b"layer bytes").await.unwrap();
    let manifest = pack_manifest(
        stage,
        "application/spdx+json",
        PackOptions {
            layers: vec![layer.clone()],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let config = describe(b"{}", &MediaType::EmptyJSON.to_string());
    for blob in [&config, &layer, &manifest] {
        remote
            .push(blob, &stage.fetch(blob).await.unwrap())
            .await
            .unwrap();
    }
    manifest
}

#[tokio::test]
async fn missing_content_is_not_found() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();
    let blob = describe(b"never pushed", "text/plain");
    let manifest = describe(b"{\"schemaVersion\":2}", &MediaType::ImageManifest.to_string());

    assert!(!remote.exists(&blob).await.unwrap());
    assert!(!remote.exists(&manifest).await.unwrap());

    let log = registry.take_log();
    assert!(log.contains(&format!("HEAD /v2/sbom/blobs/{}", blob.digest())));
    assert!(log.contains(&format!("HEAD /v2/sbom/manifests/{}", manifest.digest())));

    assert!(matches!(
        remote.fetch(&blob).await.unwrap_err(),
        ObomError::NotFound(_)
    ));
    assert!(matches!(
        remote.resolve("v1").await.unwrap_err(),
        ObomError::NotFound(_)
    ));
}

#[tokio::test]
async fn blob_push_uses_chunked_upload() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();
    let blob = describe(b"hello registry", "text/plain");

    remote.push(&blob, b"hello registry").await.unwrap();

    let log = registry.take_log();
    assert!(log.contains(&"POST /v2/sbom/blobs/uploads/".to_string()));
    assert!(log.iter().any(|l| l.starts_with("PATCH /v2/sbom/blobs/uploads/")));
    assert!(log.iter().any(|l| l.starts_with("PUT /v2/sbom/blobs/uploads/")));

    assert!(remote.exists(&blob).await.unwrap());
    assert_eq!(remote.fetch(&blob).await.unwrap(), b"hello registry");
}

#[tokio::test]
async fn manifest_push_then_tag_by_repush() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();
    let stage = MemoryStore::new();
    let manifest = upload_manifest(&stage, &remote).await;

    assert!(registry.has_manifest(manifest.digest()));
    registry.take_log();
    assert!(remote.exists(&manifest).await.unwrap());
    // Answered from the HEAD response headers alone.
    assert!(!registry
        .take_log()
        .iter()
        .any(|l| l.starts_with("GET /v2/sbom/manifests/")));

    assert!(!registry.has_manifest("v1"));
    remote.tag(&manifest, "v1").await.unwrap();
    assert!(registry.take_log().contains(&"PUT /v2/sbom/manifests/v1".to_string()));

    let resolved = remote.resolve("v1").await.unwrap();
    assert_eq!(resolved.digest(), manifest.digest());
    assert_eq!(resolved.size(), manifest.size());
    assert_eq!(resolved.media_type(), &MediaType::ImageManifest);
    assert_eq!(
        resolved.artifact_type(),
        &Some(MediaType::from("application/spdx+json"))
    );
}

#[tokio::test]
async fn digest_tag_is_a_no_op() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();
    let stage = MemoryStore::new();
    let manifest = upload_manifest(&stage, &remote).await;
    registry.take_log();

    remote.tag(&manifest, manifest.digest()).await.unwrap();
    assert!(registry.take_log().is_empty());

    let other = Digest::from_bytes(b"other").to_string();
    assert!(matches!(
        remote.tag(&manifest, &other).await.unwrap_err(),
        ObomError::DigestMismatch { .. }
    ));
}

#[tokio::test]
async fn referrer_needs_subject_on_remote() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();
    let stage = MemoryStore::new();

    let subject = pack_manifest(&stage, "application/spdx+json", PackOptions::default())
        .await
        .unwrap();
    let layer = describe(b"test signature", "application/cose");
    stage.push(&layer, b"test signature").await.unwrap();

    let err = pack_referrer(&stage, &remote, "application/cose", vec![layer], &subject)
        .await
        .unwrap_err();
    assert!(matches!(err, ObomError::SubjectNotPresent { .. }));
}

#[tokio::test]
async fn push_sbom_with_attachment() {
    let registry = MockRegistry::start().await;
    let remote = registry.repository();

    let dir = TempDir::new().unwrap();
    let sbom_path = dir.path().join("sbom.spdx.json");
    let sig_path = dir.path().join("sig.cose");
    std::fs::write(&sbom_path, SBOM).unwrap();
    std::fs::write(&sig_path, "test signature").unwrap();

    let loaded = load_sbom_from_file(&sbom_path, false).unwrap();
    let mut request = PushRequest::new(registry.reference("v1"));
    request.attachments =
        AttachmentSet::from_flags(&[format!("application/cose={}", sig_path.display())]).unwrap();

    let outcome = push_sbom(&loaded, &request, &remote, &Publisher::default())
        .await
        .unwrap();

    let tagged = remote.resolve("v1").await.unwrap();
    assert_eq!(tagged.digest(), outcome.sbom.digest());
    assert!(!registry.has_manifest("latest"));

    let referrers = remote
        .referrers(&outcome.sbom, Some("application/cose"))
        .await
        .unwrap();
    assert_eq!(referrers.len(), 1);
    assert_eq!(referrers[0].digest(), outcome.attachments[0].descriptor.digest());
    assert_eq!(
        referrers[0].artifact_type(),
        &Some(MediaType::from("application/cose"))
    );

    let attachment = remote.fetch(&referrers[0]).await.unwrap();
    let manifest = parse_manifest(&attachment).unwrap();
    assert_eq!(manifest.layers()[0].title(), Some("sig.cose"));
    assert_eq!(
        remote.fetch(&manifest.layers()[0]).await.unwrap(),
        b"test signature"
    );
}
