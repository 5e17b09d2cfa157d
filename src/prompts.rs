//! Prompt templates for quiz generation.
//!
//! Every template asks the model for the same two-section layout,
//! `DOMANDE:` then `RISPOSTE:`, because
//! [`crate::pipeline::postprocess::split_reply`] relies on those literal
//! headers. Changing a header here without changing the splitter breaks the
//! answer section silently.

use crate::config::QuestionStyle;
use std::fmt::Write as _;

/// Header that opens the question section of a reply.
pub const QUESTIONS_HEADER: &str = "DOMANDE:";

/// Header that opens the answer section of a reply.
pub const ANSWERS_HEADER: &str = "RISPOSTE:";

/// Default system message.
pub const SYSTEM_PROMPT: &str =
    "Sei un insegnante esperto. Genera domande e risposte in italiano dal materiale fornito.";

/// Label placed before the merged study text.
pub const MATERIAL_LABEL: &str = "Materiale di studio:\n";

/// Directives closing every template.
const CLOSING_RULES: &str = "- Non aggiungere testo introduttivo o conclusivo.\n\
- Scrivi TUTTO in italiano.\n\
- Usa SOLO informazioni dal materiale fornito.\n\n";

/// Write the instruction block for `style`, fixing the question count at `n`.
///
/// The returned text ends with the closing directives and a blank line; the
/// study material, if any, is appended by the caller.
pub fn instructions(style: QuestionStyle, n: u32) -> String {
    let mut b = String::with_capacity(768);
    let (intro, questions, answers) = match style {
        QuestionStyle::TrueFalse => (
            format!(
                "- Estrai i punti principali dal materiale fornito.\n\
- Produci esattamente {n} domande VERO o FALSO IN ITALIANO."
            ),
            "1. [Affermazione che può essere vera o falsa]\n\
2. [Affermazione che può essere vera o falsa]\n",
            "1. Vero / Falso (con breve spiegazione)\n\
2. Vero / Falso (con breve spiegazione)\n",
        ),
        QuestionStyle::Sequential => (
            format!(
                "- Estrai eventi, processi o passaggi sequenziali dal materiale fornito.\n\
- Produci esattamente {n} domande SEQUENZIALI IN ITALIANO che richiedono di ordinare o descrivere una sequenza."
            ),
            "1. Qual è la sequenza corretta di...?\n\
2. Metti in ordine i seguenti passaggi...\n",
            "1. La sequenza corretta è: ...\n\
2. L'ordine corretto è: ...\n",
        ),
        QuestionStyle::Complex => (
            format!(
                "- Estrai concetti complessi e relazioni dal materiale fornito.\n\
- Produci esattamente {n} domande COMPLESSE IN ITALIANO che richiedono analisi approfondita, confronto, o sintesi di più concetti."
            ),
            "1. Spiega la relazione tra... e come...\n\
2. Confronta e analizza...\n\
3. Perché... e quali sono le implicazioni di...\n",
            "1. [Risposta articolata e dettagliata]\n\
2. [Risposta articolata e dettagliata]\n",
        ),
        QuestionStyle::DatesAndNumbers => (
            format!(
                "- Estrai date, numeri, statistiche e dati numerici specifici dal materiale fornito.\n\
- Produci esattamente {n} domande IN ITALIANO incentrate su DATE e NUMERI."
            ),
            "1. In che anno...?\n\
2. Quanti...?\n\
3. Qual è la percentuale di...?\n",
            "1. [Anno o data specifica]\n\
2. [Numero specifico]\n\
3. [Percentuale o valore numerico]\n",
        ),
        QuestionStyle::None => (
            format!(
                "- Estrai i punti principali dal materiale fornito.\n\
- Produci esattamente {n} domande IN ITALIANO con le relative risposte."
            ),
            "1. Prima domanda\n\
2. Seconda domanda\n\
3. Terza domanda\n",
            "1. Risposta alla prima domanda\n\
2. Risposta alla seconda domanda\n\
3. Risposta alla terza domanda\n",
        ),
    };

    // Writing to a String cannot fail.
    let _ = write!(
        b,
        "Istruzioni:\n{intro}\n- Usa questo formato RIGOROSO:\n\n\
{QUESTIONS_HEADER}\n{questions}...\n\n\
{ANSWERS_HEADER}\n{answers}...\n\n"
    );
    b.push_str(CLOSING_RULES);
    b
}
