use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use http::Request;
use http_body_util::Full;
use micro_body::parser::multipart::FormField;
use micro_body::read::Reader;
use micro_body::{BodyError, MultipartReader, OptionReqBody, ReadOptions, RequestHeader, ResponseHead};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

const FORM: &str = "--xYzZY\r\n\
    content-disposition: form-data; name=\"title\"\r\n\
    \r\n\
    holiday\r\n\
    --xYzZY\r\n\
    content-disposition: form-data; name=\"photos\"; filename=\"beach.txt\"\r\n\
    content-type: text/plain\r\n\
    \r\n\
    sand and sea\r\n\
    --xYzZY--\r\n";

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = read_json().await {
        error!(code = e.code(), cause = %e, "read json body failed");
    }

    if let Err(e) = read_form().await {
        error!(code = e.code(), cause = %e, "read form body failed");
    }

    let e = read_too_large().await.expect_err("body should exceed the limit");
    info!(code = e.code(), status = %e.status_code(), "oversized body rejected");
}

async fn read_json() -> Result<(), BodyError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(br#"{"user":"zava","tags":["http","rust"]}"#).expect("write to vec");
    let compressed = encoder.finish().expect("finish gzip");

    let header = RequestHeader::from(
        Request::post("/users")
            .header("content-type", "application/json; charset=utf-8")
            .header("content-encoding", "gzip")
            .header("content-length", compressed.len())
            .body(())
            .expect("valid request"),
    );
    let body = OptionReqBody::from(Full::new(Bytes::from(compressed)));

    let reader = Reader::new(ReadOptions::default(), |text: &str| serde_json::from_str::<serde_json::Value>(text));
    let value = reader.read(&header, &body, &mut ResponseHead::default()).await?;
    info!(%value, "read json body");
    Ok(())
}

async fn read_form() -> Result<(), BodyError> {
    let header = RequestHeader::from(
        Request::post("/albums").header("content-type", "multipart/form-data; boundary=xYzZY").body(()).expect("valid request"),
    );
    let body = OptionReqBody::from(Full::new(Bytes::from_static(FORM.as_bytes())));

    let reader = MultipartReader::new(ReadOptions::multipart_builder().build()?);
    let Some(form) = reader.read_form_data(&header, &body, &mut ResponseHead::default()).await? else {
        return Ok(());
    };

    for field in &form {
        match field {
            FormField::Value { name, content, .. } => info!(%name, value = ?content, "form value"),
            FormField::FileList { name, files } => {
                for file in files {
                    info!(%name, filename = file.filename(), size = file.content().len(), "form file");
                }
            }
        }
    }
    Ok(())
}

async fn read_too_large() -> Result<Bytes, BodyError> {
    let header = RequestHeader::from(Request::post("/upload").body(()).expect("valid request"));
    let body = OptionReqBody::from(Full::new(Bytes::from(vec![b'x'; 4096])));

    let reader = micro_body::RawReader::new(ReadOptions::builder().size_limit(1024).build()?);
    reader.read(&header, &body, &mut ResponseHead::default()).await
}
