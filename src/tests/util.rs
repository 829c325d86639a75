use serde_json::Value;

pub fn log_try_init() {
    let _ = env_logger::builder()
        .format_target(false)
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

pub fn json(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

pub const SIMPLE: &str = r#"{"a": "b"}"#;

pub const NESTED: &str = r#"{
    "a": "b",
    "v": [
        {"x": "test1", "y": "hello"},
        {"x": "test2", "y": "world"}
    ],
    "f": {"w": "hi", "q": "welcome", "y": "ciao"},
    "y": "c"
}"#;

pub const ROUTES: &str = r#"{
    "name": "default/eg/http",
    "virtual_hosts": [
        {
            "name": "default/eg/http/www_test_com",
            "domains": ["www.test.com"],
            "routes": [
                {
                    "name": "httproute/default/backend/rule/0/match/0/www_test_com",
                    "match": {"prefix": "/"},
                    "route": {"cluster": "httproute/default/backend/rule/0"}
                }
            ]
        },
        {
            "name": "default/eg/http/www_example_com",
            "domains": ["www.example.com"],
            "routes": [
                {
                    "name": "httproute/default/backend/rule/1/match/1/www_example_com",
                    "match": {"prefix": "/"},
                    "route": {"cluster": "httproute/default/backend/rule/1"}
                }
            ]
        }
    ],
    "ignore_port_in_host_matching": true
}"#;
