/// Build the extraction prompt for one message.
pub fn extraction_prompt(message_content: &str, context: &str) -> String {
    format!(
        r#"You are analyzing a message from an AI-assisted software development conversation. Extract entities and relationships to build a knowledge graph.

CONTEXT: {context}

MESSAGE CONTENT:
{message_content}

Extract the following as structured JSON:

1. ENTITIES (with confidence 0.0-1.0):
   - FILES: source files, configs (e.g. "src/main.zig", "build.zig")
   - FUNCTIONS: function/method names (e.g. "buildGraph", "parseJSON")
   - CONCEPTS: algorithms, patterns, architectures (e.g. "FRE algorithm", "HNSW index")
   - TOOLS: commands, operations (e.g. "zig build", "git commit")
   - DECISIONS: architectural choices (e.g. "use Zig for performance", "implement CRDT")
   - ERRORS: problems encountered (e.g. "compilation error", "memory leak")
   - SOLUTIONS: fixes applied (e.g. "add error handling", "fix memory allocation")

2. RELATIONSHIPS (with confidence 0.0-1.0):
   - DEPENDS_ON: A requires B functionality
   - IMPLEMENTS: A realizes concept/decision B
   - CALLS: function A invokes function B
   - MODIFIES: tool/action A changes entity B
   - CREATES: A brings B into existence
   - TESTS: A validates B functionality
   - FIXES: A resolves problem B
   - SIMILAR_TO: A serves similar purpose as B
   - EVOLVES_FROM: A is modified version of B
   - CONTAINS: A includes B as component

3. KEY_CONCEPTS: Main technical concepts discussed

Format as JSON:
{{
  "entities": [
    {{"name": "entity_name", "type": "FILE|FUNCTION|CONCEPT|TOOL|DECISION|ERROR|SOLUTION", "confidence": 0.8, "context": "brief context"}}
  ],
  "relationships": [
    {{"from": "entity1", "to": "entity2", "type": "DEPENDS_ON|IMPLEMENTS|...", "confidence": 0.9, "evidence": "why this relationship exists"}}
  ],
  "concepts": ["concept1", "concept2"]
}}

Focus on technical entities and meaningful relationships. Ignore conversational fluff.
"#
    )
}
