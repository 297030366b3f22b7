#[cfg(test)]
pub mod test {
    use crate::extrapolate::MapProperties;
    use crate::node::Node;

    /// A small service description used across the query tests.
    pub const SERVICE_YAML: &str = "\
server:
  host: localhost
  port: 8080
  debug: \"false\"
servers:
  - name: alpha
    env: prod
    port: 9001
  - name: beta
    env: test
    port: 9002
  - name: gamma
    env: prod
    port: 9003
";

    /// Parse a YAML document into a tree.
    pub fn tree(yaml: &str) -> Node {
        Node::parse_yaml("test", yaml).unwrap()
    }

    /// Fixed properties and environment for extrapolation tests.
    pub fn props() -> MapProperties {
        MapProperties::new()
            .with_property("user.name", "tester")
            .with_property("port", "9000")
            .with_property("enabled", "true")
            .with_property("ratio", "0.75")
            .with_env("HOME", "/home/tester")
    }

    #[test]
    fn service_fixture_parses() {
        let root = tree(SERVICE_YAML);
        let map = root.as_mapping().unwrap();
        assert_eq!(map["servers"].as_sequence().unwrap().len(), 3);
    }
}
