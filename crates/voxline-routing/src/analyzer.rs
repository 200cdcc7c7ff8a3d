// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword classification of short caller replies (Portuguese).

const AFFIRMATIVE: &[&str] = &[
    "sim",
    "isso",
    "correto",
    "certo",
    "pode",
    "positivo",
    "exato",
    "ok",
    "tá",
    "uhum",
    "aham",
    "confirmo",
    "isso mesmo",
    "tá certo",
    "está certo",
    "isso aí",
    "pode ser",
];

const NEGATIVE: &[&str] = &[
    "não",
    "nao",
    "errado",
    "incorreto",
    "outro",
    "diferente",
    "negativo",
    "tá errado",
    "está errado",
    "outro número",
];

const CALLBACK: &[&str] = &[
    "retornar",
    "ligar de volta",
    "me ligar",
    "retorno",
    "liga pra mim",
    "ligação de volta",
    "callback",
];

const MESSAGE: &[&str] = &["recado", "mensagem", "anotar", "avisar"];

/// Utterances shorter than this with no keyword are read as assent ("é", "hm").
const SHORT_REPLY_CHARS: usize = 5;

/// Classifies caller replies during confirmation prompts.
pub struct ResponseAnalyzer;

impl ResponseAnalyzer {
    /// Negative keywords veto; otherwise an affirmative keyword or a very short
    /// reply counts as a yes.
    pub fn is_affirmative(text: &str) -> bool {
        let lowered = text.trim().to_lowercase();
        if contains_any(&lowered, NEGATIVE) {
            return false;
        }
        if contains_any(&lowered, AFFIRMATIVE) {
            return true;
        }
        lowered.chars().count() < SHORT_REPLY_CHARS
    }

    pub fn is_negative(text: &str) -> bool {
        contains_any(&text.trim().to_lowercase(), NEGATIVE)
    }

    /// Caller asks to be called back later.
    pub fn wants_callback(text: &str) -> bool {
        contains_any(&text.to_lowercase(), CALLBACK)
    }

    /// Caller wants to leave a message instead.
    pub fn wants_message(text: &str) -> bool {
        contains_any(&text.to_lowercase(), MESSAGE)
    }
}

/// Multi-word keywords match as substrings, single words as whole tokens.
fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    keywords.iter().any(|kw| {
        if kw.contains(' ') {
            lowered.contains(kw)
        } else {
            tokens.contains(kw)
        }
    })
}
