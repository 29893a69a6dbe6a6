//! Pokémon lookup tool backed by PokéAPI.

use async_trait::async_trait;
use serde_json::Value;
use tooloop_core::error::ToolError;
use tooloop_core::tool::{FieldKind, InputSchema, Tool, ToolOutput};

const ENDPOINT: &str = "https://pokeapi.co/api/v2/pokemon";
const FIELDS: [&str; 5] = ["height", "weight", "type", "ability", "image"];

pub struct PokemonInfoTool {
    client: reqwest::Client,
}

impl PokemonInfoTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for PokemonInfoTool {
    fn name(&self) -> &str {
        "pokemon_info"
    }

    fn description(&self) -> &str {
        "Get Pokémon info. By default returns the name and image. Use `field` for specific \
         info like height, weight, type, ability or image."
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::empty()
            .required("name", FieldKind::String, "Pokémon name like pikachu or charizard")
            .optional("field", FieldKind::one_of(FIELDS), "Specific info the user wants")
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let name = arguments["name"].as_str().unwrap_or_default().trim().to_lowercase();
        if name.is_empty() {
            return Err(ToolError::invalid(self.name(), "name must not be empty"));
        }
        let field = arguments["field"].as_str();

        let response = self
            .client
            .get(format!("{ENDPOINT}/{name}"))
            .send()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::failed(self.name(), format!("Pokemon \"{name}\" not found")));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ToolError::failed(self.name(), format!("unexpected response: {e}")))?;
        describe_pokemon(&data, field)
    }
}

/// Shape the PokéAPI payload into what the model asked for.
pub fn describe_pokemon(data: &Value, field: Option<&str>) -> Result<ToolOutput, ToolError> {
    let name = data["name"].as_str().unwrap_or("unknown");
    let image = data["sprites"]["front_default"].clone();

    let output = match field {
        None => ToolOutput::Structured(serde_json::json!({ "name": name, "image": image })),
        Some("height") => ToolOutput::Text(format!("{name} height is {}", data["height"])),
        Some("weight") => ToolOutput::Text(format!("{name} weight is {}", data["weight"])),
        Some("type") => ToolOutput::Structured(Value::Array(names_of(&data["types"], "type"))),
        Some("ability") => {
            ToolOutput::Structured(Value::Array(names_of(&data["abilities"], "ability")))
        }
        Some("image") => match image {
            Value::String(url) => ToolOutput::Text(url),
            _ => ToolOutput::Text(format!("{name} has no image")),
        },
        Some(other) => {
            return Err(ToolError::invalid(
                "pokemon_info",
                format!("Invalid field requested: {other}"),
            ));
        }
    };
    Ok(output)
}

/// `[{ "<key>": { "name": .. } }, ..]` → `["..", ..]`
fn names_of(list: &Value, key: &str) -> Vec<Value> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item[key]["name"].as_str())
                .map(|n| Value::String(n.to_string()))
                .collect()
        })
        .unwrap_or_default()
}
