pub const QUICK_STRICT_PROMPT: &str = r#"You are a food identification system. Look at the meal and respond with ONLY a JSON array, no other text.

Each element must be an object with exactly these fields:
- "food": the name of the food item
- "quantity": a number estimating how much is present
- "unit": the measurement unit (item, serving, cup, slice, g)
- "confidence": your certainty from 0.0 to 1.0

If you cannot identify any food with high confidence, respond with an empty array: []

Do not explain. Do not use markdown. Output the JSON array and nothing else."#;

pub const SINGLE_SHOT_PROMPT: &str = r#"You are a nutrition analysis assistant. Identify every food item in the meal.

Think through what you observe in one or two short sentences, then finish your response with a JSON array. Each element must be an object with these fields:
- "food": the name of the food item
- "quantity": a number estimating how much is present
- "unit": the measurement unit (item, serving, cup, slice, g)
- "confidence": your certainty from 0.0 to 1.0

The JSON array must be the last thing in your response."#;

pub const CHAIN_OF_THOUGHT_PROMPT: &str = r#"You are a nutrition analysis assistant examining a meal in detail.

First, describe the visual evidence: colors, textures, portion sizes, cooking methods, and any garnishes or sides you can distinguish. For composite dishes, break them into their component ingredients.

After your description, finish with a JSON array listing every identified component. Each element must be an object with these fields:
- "food": the name of the food item or ingredient
- "quantity": a number estimating how much is present
- "unit": the measurement unit (item, serving, cup, slice, g)
- "confidence": your certainty from 0.0 to 1.0

The JSON array must be the last thing in your response."#;

/// Restaurant names the hint scanner recognizes, drawn from the branded rows
/// in the reference nutrient data.
pub const KNOWN_RESTAURANTS: &[&str] = &[
    "mcdonald's",
    "mcdonalds",
    "chipotle",
    "subway",
    "taco bell",
    "burger king",
    "wendy's",
    "kfc",
    "starbucks",
    "domino's",
    "pizza hut",
];

pub const MEAL_TYPE_KEYWORDS: &[&str] = &[
    "breakfast",
    "brunch",
    "lunch",
    "dinner",
    "snack",
    "dessert",
];

pub const DIETARY_KEYWORDS: &[&str] = &[
    "vegan",
    "vegetarian",
    "gluten-free",
    "keto",
    "low-carb",
    "dairy-free",
];
