//! GEXF Call-Graph Writer
//!
//! Serializes a [`CallGraph`] as a GEXF 1.2 document for graph tools.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <gexf xmlns="http://www.gexf.net/1.2draft" version="1.2">
//!   <graph defaultedgetype="directed" mode="static">
//!     <nodes>
//!       <node id="org.demo.Parser" label="org.demo.Parser"/>
//!     </nodes>
//!     <edges>
//!       <edge id="0" source="org.demo.ParserTest" target="org.demo.Parser"/>
//!     </edges>
//!   </graph>
//! </gexf>
//! ```

use std::path::Path;

use quick_xml::escape::escape;

use super::CallGraph;
use crate::result::TraceResult;

/// GEXF format generator
#[derive(Debug)]
pub struct GexfWriter<'a> {
    graph: &'a CallGraph,
    creator: String,
}

impl<'a> GexfWriter<'a> {
    /// Create a writer for `graph`
    #[must_use]
    pub fn new(graph: &'a CallGraph) -> Self {
        Self {
            graph,
            creator: "covmatrix".to_string(),
        }
    }

    /// Set the creator recorded in the meta block
    #[must_use]
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    /// Generate the document
    #[must_use]
    pub fn generate(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<gexf xmlns="http://www.gexf.net/1.2draft" version="1.2">"#);
        xml.push('\n');
        xml.push_str(&format!(
            "  <meta>\n    <creator>{}</creator>\n  </meta>\n",
            escape(self.creator.as_str())
        ));
        xml.push_str("  <graph defaultedgetype=\"directed\" mode=\"static\">\n");

        xml.push_str("    <nodes>\n");
        for node in self.graph.nodes() {
            let node = escape(node);
            xml.push_str(&format!("      <node id=\"{node}\" label=\"{node}\"/>\n"));
        }
        xml.push_str("    </nodes>\n");

        xml.push_str("    <edges>\n");
        for (index, (source, target)) in self.graph.edges().enumerate() {
            xml.push_str(&format!(
                "      <edge id=\"{index}\" source=\"{}\" target=\"{}\"/>\n",
                escape(source),
                escape(target)
            ));
        }
        xml.push_str("    </edges>\n");

        xml.push_str("  </graph>\n</gexf>\n");
        xml
    }

    /// Write the document to `path`
    pub fn save(&self, path: &Path) -> TraceResult<()> {
        std::fs::write(path, self.generate())?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::markup::{tags, TagKind};
    use tempfile::TempDir;

    fn graph() -> CallGraph {
        CallGraph::from_edges([
            ("t.FooTest".to_string(), "p.Foo".to_string()),
            ("p.Foo".to_string(), "p.Bar<T>".to_string()),
        ])
    }

    #[test]
    fn test_lists_nodes_and_edges() {
        let xml = GexfWriter::new(&graph()).generate();
        let empty: Vec<_> = tags(&xml)
            .map(Result::unwrap)
            .filter(|t| t.kind == TagKind::Empty)
            .collect();
        let nodes = empty.iter().filter(|t| t.name == "node").count();
        let edges: Vec<_> = empty.iter().filter(|t| t.name == "edge").collect();
        assert_eq!(nodes, 3);
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].attr("source"), Some("p.Foo"));
        assert_eq!(edges[0].attr("target"), Some("p.Bar<T>"));
    }

    #[test]
    fn test_names_escaped() {
        let xml = GexfWriter::new(&graph()).generate();
        assert!(xml.contains("p.Bar&lt;T&gt;"));
        assert!(!xml.contains("p.Bar<T>"));
    }

    #[test]
    fn test_creator() {
        let xml = GexfWriter::new(&graph()).with_creator("bench").generate();
        assert!(xml.contains("<creator>bench</creator>"));
    }

    #[test]
    fn test_save_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("call_graph.gexf");
        GexfWriter::new(&graph()).save(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("<?xml"));
    }
}
