//! A fake miner API for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the fake miner answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    /// JSON body followed by a NUL terminator, then close.
    Json(Value),
    /// Raw bytes, then close.
    Raw(Vec<u8>),
    /// Accept the request and never answer.
    Silent,
}

/// A miner API listening on a random local port.
pub struct MockMiner {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockMiner {
    /// Start serving `replies`, keyed by command name.
    pub async fn start(replies: HashMap<&'static str, Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let replies = Arc::new(replies);

        let recorded = requests.clone();
        let task = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let replies = replies.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    handle(stream, &replies, &recorded).await;
                });
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Command names received so far, one per connection.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for MockMiner {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    mut stream: TcpStream,
    replies: &HashMap<&'static str, Reply>,
    recorded: &Mutex<Vec<String>>,
) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    let request: Value = loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.extend_from_slice(&chunk[..n]);
        if let Ok(request) = serde_json::from_slice(&buffer) {
            break request;
        }
    };

    let command = request["command"].as_str().unwrap_or_default().to_string();
    recorded.lock().push(command.clone());

    match replies.get(command.as_str()) {
        Some(Reply::Json(body)) => {
            let mut bytes = body.to_string().into_bytes();
            bytes.push(0);
            let _ = stream.write_all(&bytes).await;
        }
        Some(Reply::Raw(bytes)) => {
            let _ = stream.write_all(bytes).await;
        }
        Some(Reply::Silent) => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        None => {
            let body = json!({"STATUS": [{"STATUS": "E", "Msg": "Invalid command"}]});
            let _ = stream.write_all(body.to_string().as_bytes()).await;
        }
    }
    let _ = stream.shutdown().await;
}

/// Replies of an Antminer running CGMiner with two pools.
pub fn cgminer_replies() -> HashMap<&'static str, Reply> {
    rig_replies(json!({
        "CGMiner": "4.9.0", "API": "3.7", "Miner": "16.8.1.3",
        "CompileTime": "Fri Aug 25 17:28:57 CST 2017", "Type": "Antminer S9"
    }))
}

/// Replies of an Antminer running BMMiner.
pub fn bmminer_replies() -> HashMap<&'static str, Reply> {
    rig_replies(json!({
        "BMMiner": "2.0.0", "API": "3.1", "Miner": "16.8.1.3",
        "CompileTime": "Thu Mar 22 09:39:41 CST 2018", "Type": "Antminer S9j"
    }))
}

fn rig_replies(version: Value) -> HashMap<&'static str, Reply> {
    let status = json!([{"STATUS": "S", "When": 1_700_000_000, "Code": 22, "Msg": "OK"}]);

    let mut replies = HashMap::new();
    replies.insert(
        "version",
        Reply::Json(json!({"STATUS": status, "VERSION": [version]})),
    );
    replies.insert(
        "stats",
        Reply::Json(json!({"STATUS": status, "STATS": [
            {"BMMiner": "2.0.0", "Miner": "16.8.1.3", "Type": "Antminer S9"},
            {
                "STATS": 0, "ID": "BC50", "Elapsed": 86400,
                "fan_num": 2, "fan3": 5880, "fan6": 6000,
                "temp_num": 3, "temp6": 61, "temp7": 63, "temp8": 60,
                "temp2_6": 76, "temp2_7": 78, "temp2_8": 75,
                "temp_max": 63,
                "frequency": "650",
                "chain_acn6": 63, "chain_acn7": 63, "chain_acn8": 63,
                "chain_rate6": "4521.33", "chain_rate7": "4498.01", "chain_rate8": "",
                "chain_hw6": 12, "chain_hw7": 3, "chain_hw8": 0,
                "freq_avg6": 650.0, "freq_avg7": 650.0, "freq_avg8": 650.0
            }
        ]})),
    );
    replies.insert(
        "pools",
        Reply::Json(json!({"STATUS": status, "POOLS": [
            pool(0, "stratum+tcp://eu.pool.example:3333", "Alive", true, "0:00:12"),
            pool(1, "stratum+tcp://us.pool.example:3333", "Dead", false, "0"),
        ]})),
    );
    replies.insert(
        "summary",
        Reply::Json(json!({"STATUS": status, "SUMMARY": [{
            "Elapsed": 86400, "GHS 5s": "13,519.34", "GHS av": 13501.27,
            "Found Blocks": 0, "Getworks": 5210, "Accepted": 30211,
            "Rejected": 54, "Hardware Errors": 15, "Utility": 20.98,
            "Stale": 2, "Total MH": 1.16659e12
        }]})),
    );
    replies.insert(
        "devs",
        Reply::Json(json!({"STATUS": status, "DEVS": []})),
    );
    replies
}

fn pool(index: u64, url: &str, status: &str, active: bool, last_share: &str) -> Value {
    json!({
        "POOL": index,
        "URL": url,
        "Status": status,
        "Priority": index,
        "Getworks": 4120 + index,
        "Accepted": 30200,
        "Rejected": 50 + index,
        "Stale": 2,
        "Last Share Time": last_share,
        "Difficulty Accepted": 247_463_936.0,
        "Difficulty Rejected": 442_368.0,
        "Last Share Difficulty": 8192.0,
        "Stratum Active": active,
        "Stratum URL": url.trim_start_matches("stratum+tcp://").trim_end_matches(":3333")
    })
}
