

use std::collections::HashSet;

use super::models::{Direction, GraphContext, RelationshipPath};


pub const NO_RELATIONSHIPS: &str = "No relationships found.";


/// Linearizes relationship paths into arrow statements under a query header.
///
/// Never fails: an error-tagged context renders as `Error: ...`, an empty path
/// set as [`NO_RELATIONSHIPS`].
pub struct PathFormatter;

impl PathFormatter {

    pub fn format(paths: &[RelationshipPath], query: &str) -> String {
        if paths.is_empty() {
            return NO_RELATIONSHIPS.to_string();
        }

        let statements = Self::statements(paths);
        format!(
            "Query: {}\nFound {} unique relationships:\n{}",
            query,
            statements.len(),
            statements.join("\n")
        )
    }


    pub fn format_context(context: &GraphContext) -> String {
        match context {
            GraphContext::Failed { error } => format!("Error: {}", error),
            GraphContext::Found(evidence) => Self::format(&evidence.relationships, &evidence.query),
        }
    }

    /// One statement per hop, deduplicated across the whole batch in
    /// first-seen order.
    pub fn statements(paths: &[RelationshipPath]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut statements = Vec::new();

        for path in paths {
            let anchor = path.source.as_str();
            for (i, rel) in path.relationships.iter().enumerate() {
                let Some(next) = path.path_nodes.get(i + 1) else {
                    break;
                };
                let rel_type = rel.rel_type.to_lowercase();
                let statement = match rel.direction {
                    Direction::Outgoing => format!("- {} -> {} -> {}", anchor, rel_type, next.id),
                    Direction::Incoming => format!("- {} -> {} -> {}", next.id, rel_type, anchor),
                    Direction::Undirected => format!("- {} -- {} -- {}", anchor, rel_type, next.id),
                };
                if seen.insert(statement.clone()) {
                    statements.push(statement);
                }
            }
        }

        statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::PathNode;
    use crate::retrieval::models::{GraphContextMetadata, GraphEvidence, RelationshipDescriptor};

    fn path(source: &str, hops: &[(&str, Direction, &str)]) -> RelationshipPath {
        let mut path_nodes = vec![PathNode {
            id: source.to_string(),
            text: format!("{} text", source),
        }];
        let mut relationships = Vec::new();
        for (rel_type, direction, next) in hops {
            relationships.push(RelationshipDescriptor {
                rel_type: rel_type.to_string(),
                direction: *direction,
            });
            path_nodes.push(PathNode {
                id: next.to_string(),
                text: String::new(),
            });
        }
        RelationshipPath {
            source: source.to_string(),
            source_text: format!("{} text", source),
            relationships,
            path_nodes,
        }
    }

    #[test]
    fn test_statement_shapes() {
        let paths = vec![path(
            "Delirium",
            &[("OCCURS_IN", Direction::Outgoing, "ICU"), ("LOCATED_IN", Direction::Undirected, "Hospital")],
        ), path("Delirium", &[("REDUCES", Direction::Incoming, "Dexmedetomidine")])];

        let out = PathFormatter::format(&paths, "Does dexmedetomidine prevent delirium?");
        assert_eq!(
            out,
            "Query: Does dexmedetomidine prevent delirium?\n\
             Found 3 unique relationships:\n\
             - Delirium -> occurs_in -> ICU\n\
             - Delirium -- located_in -- Hospital\n\
             - Dexmedetomidine -> reduces -> Delirium"
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let paths = vec![
            path("A", &[("CAUSES", Direction::Outgoing, "B")]),
            path("A", &[("CAUSES", Direction::Outgoing, "B"), ("TREATS", Direction::Undirected, "C")]),
            path("B", &[("CAUSES", Direction::Incoming, "A")]),
        ];

        // The incoming hop seen from B renders the same edge as the first path.
        let statements = PathFormatter::statements(&paths);
        assert_eq!(statements, vec!["- A -> causes -> B", "- A -- treats -- C"]);

        let out = PathFormatter::format(&paths, "q");
        assert!(out.starts_with("Query: q\nFound 2 unique relationships:\n"));
        assert_eq!(out, PathFormatter::format(&paths, "q"));
    }

    #[test]
    fn test_empty_and_failed_rendering() {
        assert_eq!(PathFormatter::format(&[], "anything at all"), NO_RELATIONSHIPS);

        let failed = GraphContext::Failed {
            error: "Failed to extract entities from query".to_string(),
        };
        assert_eq!(PathFormatter::format_context(&failed), "Error: Failed to extract entities from query");

        let empty = GraphContext::Found(GraphEvidence {
            query: "q".to_string(),
            entities: Vec::new(),
            relationships: Vec::new(),
            metadata: GraphContextMetadata {
                num_entities: 2,
                num_paths: 0,
                max_depth: 2,
            },
        });
        assert_eq!(PathFormatter::format_context(&empty), NO_RELATIONSHIPS);
    }
}
