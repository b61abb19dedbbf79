use std::sync::{Arc, Once};
use std::time::Duration;

use tiny_http::{Response, Server};

use report_capture::capture::{LongImagePipeline, MemorySink};
use report_capture::report::template::ids;
use report_capture::report::DEFAULT_PAGE;
use report_capture::source::load_page;
use report_capture::{CaptureConfig, Error, ReportSession};

static INIT_PAGES: Once = Once::new();

fn start_page_server() -> String {
    INIT_PAGES.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18093").unwrap();
            for request in server.incoming_requests() {
                let response = match request.url() {
                    "/report.html" => Response::from_string(DEFAULT_PAGE).with_header(
                        "Content-Type: text/html; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    _ => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(Duration::from_millis(100));
    });

    "http://127.0.0.1:18093".to_string()
}

#[tokio::test]
async fn served_page_captures_like_the_builtin_one() {
    let base = start_page_server();
    let doc = load_page(&format!("{}/report.html", base), Duration::from_secs(5))
        .await
        .expect("page should load");
    assert!(doc.get_element_by_id(ids::REPORT_PAGE).is_some());

    let sink = Arc::new(MemorySink::new());
    let pipeline = LongImagePipeline::from_config(CaptureConfig::default(), sink.clone());
    let mut session = ReportSession::with_document(pipeline, doc);
    session.generate("55.5").await.unwrap();
    let outcome = session.capture().await.unwrap();

    assert_eq!(sink.artifacts().len(), 1);
    assert!(outcome.artifact.bytes > 100);
}

#[tokio::test]
async fn http_errors_are_load_errors() {
    let base = start_page_server();
    let err = load_page(&format!("{}/missing.html", base), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::LoadError(ref m) if m.contains("404")));
}
