pub const DEFAULT_MCP_SERVERS: &str = r#"{
  "mcp_servers": [
    {
      "name": "amap",
      "url": "https://mcp.amap.com/mcp",
      "description": "Maps, routing and weather",
      "env_key": "AMAP_KEY"
    },
    {
      "name": "github",
      "url": "https://api.githubcopilot.com/mcp/",
      "description": "GitHub repositories, issues and pull requests",
      "env_key": "GITHUB_TOKEN",
      "auth_header": "Bearer",
      "accept": "application/json, text/event-stream"
    }
  ]
}
"#;

pub const EXAMPLE_SKILL_NAME: &str = "concise-writer";

pub const EXAMPLE_SKILL: &str = r#"---
name: concise-writer
description: Rewrite answers to be short and plain
version: 0.1.0
---

# Concise Writer

When this skill is active:

1. Answer in at most three sentences.
2. Prefer plain words over jargon.
3. Put the direct answer first, details after.
"#;
