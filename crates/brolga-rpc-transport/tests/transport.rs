//! Wire-level tests: real sockets against the bundled transports.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use brolga_json_rpc_server::prelude::*;
use brolga_rpc_transport::{HttpTransport, TcpTransport, Transport, WebSocketTransport, serve};

#[derive(Debug, Deserialize)]
struct Args {
    a: i64,
    b: i64,
}

fn dispatcher() -> Arc<JsonRpcDispatcher> {
    let dispatcher = JsonRpcDispatcher::new();
    dispatcher.register(
        "multiply",
        typed(|_ctx: RequestContext, args: Args| async move {
            Ok::<_, Infallible>(args.a * args.b)
        }),
    );
    Arc::new(dispatcher)
}

async fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn connect(addr: SocketAddr) -> TcpStream {
    for _ in 0..100 {
        if let Ok(stream) = TcpStream::connect(addr).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server at {} never came up", addr);
}

#[tokio::test]
async fn tcp_transport_round_trips_a_stream() {
    let addr = free_addr().await;
    let ctx = RequestContext::new();
    let d = dispatcher();

    let transport_ctx = ctx.clone();
    tokio::spawn(async move {
        TcpTransport::new(addr)
            .run(transport_ctx, d)
            .await
            .unwrap();
    });

    let stream = connect(addr).await;
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    write_half
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"method\":\"multiply\",\"params\":{\"a\":3,\"b\":4},\"id\":1}\n",
        )
        .await
        .unwrap();
    let line = lines.next_line().await.unwrap().unwrap();
    let resp: JsonRpcResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(resp.id, Some(RequestId::Number(1)));
    assert_eq!(resp.result.unwrap().get(), "12");

    // A notification stays silent; the next answered request proves the
    // connection survived it.
    write_half
        .write_all(
            b"{\"jsonrpc\":\"2.0\",\"method\":\"multiply\",\"params\":{\"a\":1,\"b\":1}}\n\
              {\"jsonrpc\":\"2.0\",\"method\":\"multiply\",\"params\":{\"a\":2,\"b\":2},\"id\":2}\n",
        )
        .await
        .unwrap();
    let line = lines.next_line().await.unwrap().unwrap();
    let resp: JsonRpcResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(resp.id, Some(RequestId::Number(2)));
    assert_eq!(resp.result.unwrap().get(), "4");

    ctx.cancellation().cancel();
}

async fn raw_http(addr: SocketAddr, request: &str) -> String {
    let mut stream = connect(addr).await;
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn http_transport_answers_post_and_rejects_the_rest() {
    let addr = free_addr().await;
    let ctx = RequestContext::new();
    let d = dispatcher();

    let transport_ctx = ctx.clone();
    tokio::spawn(async move {
        HttpTransport::new(addr)
            .cors_origin("*")
            .run(transport_ctx, d)
            .await
            .unwrap();
    });

    let body = r#"{"jsonrpc":"2.0","method":"multiply","params":{"a":3,"b":4},"id":1}"#;
    let request = format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let response = raw_http(addr, &request).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("application/json"), "{}", response);
    assert!(response.contains(r#""result":12"#), "{}", response);

    let response = raw_http(
        addr,
        "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 405"), "{}", response);

    ctx.cancellation().cancel();
}

#[tokio::test]
async fn http_transport_selects_batch_mode_by_sniffing() {
    let addr = free_addr().await;
    let ctx = RequestContext::new();
    let d = dispatcher();

    let transport_ctx = ctx.clone();
    tokio::spawn(async move {
        HttpTransport::new(addr).run(transport_ctx, d).await.unwrap();
    });

    let body = r#"[{"jsonrpc":"2.0","method":"multiply","params":{"a":3,"b":4},"id":1}, {"jsonrpc":"2.0","method":"multiply","params":{"a":2,"b":2},"id":2}]"#;
    let request = format!(
        "POST / HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let response = raw_http(addr, &request).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

    let json_body = response.split("\r\n\r\n").nth(1).unwrap();
    let json_body = json_body.trim_start();
    // Chunked responses wrap the payload; strip framing down to the array.
    let start = json_body.find('[').unwrap();
    let end = json_body.rfind(']').unwrap();
    let responses: Vec<JsonRpcResponse> =
        serde_json::from_str(&json_body[start..=end]).unwrap();
    assert_eq!(responses.len(), 2);

    ctx.cancellation().cancel();
}

#[tokio::test]
async fn websocket_transport_answers_frames() {
    let addr = free_addr().await;
    let ctx = RequestContext::new();
    let d = dispatcher();

    let transport_ctx = ctx.clone();
    tokio::spawn(async move {
        WebSocketTransport::new(addr)
            .run(transport_ctx, d)
            .await
            .unwrap();
    });

    // The accept loop needs to be up before the handshake.
    let probe = connect(addr).await;
    drop(probe);

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/", addr))
        .await
        .expect("websocket handshake");

    ws.send(tokio_tungstenite::tungstenite::Message::text(
        r#"{"jsonrpc":"2.0","method":"multiply","params":{"a":6,"b":7},"id":9}"#,
    ))
    .await
    .unwrap();

    let reply = ws.next().await.unwrap().unwrap();
    let text = reply.into_text().unwrap();
    let resp: JsonRpcResponse = serde_json::from_str(text.as_str().trim()).unwrap();
    assert_eq!(resp.id, Some(RequestId::Number(9)));
    assert_eq!(resp.result.unwrap().get(), "42");

    ctx.cancellation().cancel();
}

#[tokio::test]
async fn serve_surfaces_the_first_bind_failure_and_cancels() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = occupied.local_addr().unwrap();

    let ctx = RequestContext::new();
    let result = serve(
        ctx.clone(),
        dispatcher(),
        vec![Arc::new(TcpTransport::new(addr)) as Arc<dyn Transport>],
    )
    .await;

    assert!(result.is_err());
    assert!(ctx.is_cancelled());
}
