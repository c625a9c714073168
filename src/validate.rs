use crate::reminders::parse_when;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

pub type Validation = Result<(), Vec<FieldError>>;

/// Accumulates every field failure of one form instead of stopping at the first.
struct Checker<'a> {
    rec: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(rec: &'a Map<String, Value>) -> Self {
        Self {
            rec,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &str, message: &str) {
        // One message per field, like the console shows them.
        if self.errors.iter().any(|e| e.field == field) {
            return;
        }
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Trimmed string value; empty strings and nulls count as absent.
    fn text(&self, field: &str) -> Option<&'a str> {
        match self.rec.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    fn wrong_type(&self, field: &str) -> bool {
        !matches!(self.rec.get(field), None | Some(Value::Null) | Some(Value::String(_)))
    }

    fn required(&mut self, field: &str, message: &str) -> Option<&'a str> {
        if self.wrong_type(field) {
            self.fail(field, message);
            return None;
        }
        let v = self.text(field);
        if v.is_none() {
            self.fail(field, message);
        }
        v
    }

    fn optional(&mut self, field: &str) -> Option<&'a str> {
        if self.wrong_type(field) {
            self.fail(field, "Valor inválido");
            return None;
        }
        self.text(field)
    }

    fn length(&mut self, field: &str, value: &str, min: usize, max: usize, label: &str) {
        let n = value.chars().count();
        if n < min {
            self.fail(field, &format!("{} deve ter pelo menos {} caracteres", label, min));
        } else if n > max {
            self.fail(field, &format!("{} deve ter no máximo {} caracteres", label, max));
        }
    }

    fn date(&mut self, field: &str, value: &str, label: &str) -> Option<NaiveDate> {
        match parse_when(value) {
            Some(dt) => Some(dt.date()),
            None => {
                self.fail(field, &format!("{} inválida", label));
                None
            }
        }
    }

    fn required_date(&mut self, field: &str, label: &str) -> Option<NaiveDate> {
        let v = self.required(field, &format!("{} é obrigatória", label))?;
        self.date(field, v, label)
    }

    fn finish(self) -> Validation {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

fn letters_and_spaces(s: &str) -> bool {
    s.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
}

fn has_consecutive_spaces(s: &str, run: usize) -> bool {
    let mut count = 0;
    for c in s.chars() {
        if c.is_whitespace() {
            count += 1;
            if count >= run {
                return true;
            }
        } else {
            count = 0;
        }
    }
    false
}

pub fn is_valid_email(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() || s.len() > 254 || s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.contains("..") {
        return false;
    }
    if local.starts_with('.') || domain.ends_with('.') || domain.starts_with('.') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Phone numbers may carry spaces, parentheses, dashes and a leading plus.
pub fn is_valid_phone(s: &str) -> bool {
    let mut digits = 0;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            ' ' | '(' | ')' | '-' | '+' => {}
            _ => return false,
        }
    }
    (10..=15).contains(&digits)
}

/// Brazilian CPF: 11 digits (punctuation ignored), not all equal, with both
/// check digits matching.
pub fn is_valid_cpf(s: &str) -> bool {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|d| *d == digits[0]) {
        return false;
    }
    let check = |len: usize| -> u32 {
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let digit = 11 - sum % 11;
        if digit >= 10 {
            0
        } else {
            digit
        }
    };
    check(9) == digits[9] && check(10) == digits[10]
}

pub fn student(rec: &Map<String, Value>) -> Validation {
    let mut c = Checker::new(rec);
    if let Some(name) = c.required("name", "Nome é obrigatório") {
        c.length("name", name, 3, 100, "Nome");
        if !letters_and_spaces(name) {
            c.fail("name", "Nome deve conter apenas letras");
        }
    }
    if let Some(cpf) = c.optional("cpf") {
        if !is_valid_cpf(cpf) {
            c.fail("cpf", "CPF inválido");
        }
    }
    if let Some(email) = c.optional("email") {
        if !is_valid_email(email) {
            c.fail("email", "Email deve ter um formato válido");
        }
    }
    for (field, max, label) in [
        ("pcd", 100, "PCD"),
        ("descricao", 500, "Descrição"),
        ("schoolClass", 50, "Turma"),
        ("notes", 1000, "Anotações"),
    ] {
        if let Some(v) = c.optional(field) {
            c.length(field, v, 0, max, label);
        }
    }
    c.finish()
}

pub fn forwarding(rec: &Map<String, Value>, today: NaiveDate) -> Validation {
    let mut c = Checker::new(rec);
    c.required("aluno", "Selecione um aluno");

    let admissao = c
        .required("dataAdmissao", "Data de admissão é obrigatória")
        .and_then(|v| c.date("dataAdmissao", v, "Data de admissão"));
    if let Some(d) = admissao {
        if d > today {
            c.fail("dataAdmissao", "Data de admissão não pode ser no futuro");
        } else if d.year() < 1900 {
            c.fail("dataAdmissao", "Data de admissão não pode ser anterior a 1900");
        }
    }

    if let Some(empresa) = c.required("empresa", "Nome da empresa é obrigatório") {
        c.length("empresa", empresa, 2, 200, "Nome da empresa");
        if has_consecutive_spaces(empresa, 2) {
            c.fail("empresa", "Nome da empresa não pode conter espaços consecutivos");
        }
    }
    if let Some(funcao) = c.required("funcao", "Função é obrigatória") {
        c.length("funcao", funcao, 2, 100, "Função");
        if !funcao.chars().all(|ch| ch.is_alphabetic() || ch.is_whitespace() || ch == '-') {
            c.fail("funcao", "Função deve conter apenas letras, hífens e espaços");
        }
    }
    if let Some(contato) = c.required("contatoRH", "Contato do RH é obrigatório") {
        if !(is_valid_email(contato) || is_valid_phone(contato)) {
            c.fail(
                "contatoRH",
                "Contato deve ser um email válido ou telefone (10-15 dígitos)",
            );
        }
    }

    if let Some(v) = c.optional("dataDesligamento") {
        if let Some(d) = c.date("dataDesligamento", v, "Data de desligamento") {
            if d > today {
                c.fail("dataDesligamento", "Data de desligamento não pode ser no futuro");
            } else if admissao.is_some_and(|a| d < a) {
                c.fail(
                    "dataDesligamento",
                    "Data de desligamento deve ser posterior ou igual à data de admissão",
                );
            }
        }
    }
    c.finish()
}

pub fn internal_control(rec: &Map<String, Value>, today: NaiveDate) -> Validation {
    let mut c = Checker::new(rec);
    c.required("aluno", "Selecione um aluno");

    let ingresso = c.required_date("ingresso", "Data de ingresso");
    let av1 = c.required_date("primeiraAvaliacao", "Data da primeira avaliação");
    let av2 = c.required_date("segundaAvaliacao", "Data da segunda avaliação");
    let en1 = c.required_date("primeiraEntrevista", "Data da primeira entrevista");
    let en2 = c.required_date("segundaEntrevista", "Data da segunda entrevista");

    if let Some(d) = ingresso {
        if d > today {
            c.fail("ingresso", "Data de ingresso não pode ser no futuro");
        } else if d.year() < 1900 {
            c.fail("ingresso", "Data de ingresso não pode ser anterior a 1900");
        }
    }
    let ordered = [
        ("primeiraAvaliacao", av1, ingresso, "Primeira avaliação deve ser posterior ou igual à data de ingresso"),
        ("segundaAvaliacao", av2, av1, "Segunda avaliação deve ser posterior ou igual à primeira avaliação"),
        ("primeiraEntrevista", en1, ingresso, "Primeira entrevista deve ser posterior ou igual à data de ingresso"),
        ("segundaEntrevista", en2, en1, "Segunda entrevista deve ser posterior ou igual à primeira entrevista"),
    ];
    for (field, date, floor, message) in ordered {
        if let (Some(d), Some(f)) = (date, floor) {
            if d < f {
                c.fail(field, message);
            }
        }
    }

    if let Some(resultado) = c.required("resultado", "Resultado é obrigatório") {
        c.length("resultado", resultado, 10, 500, "Resultado");
        if has_consecutive_spaces(resultado, 4) {
            c.fail("resultado", "Resultado não pode conter espaços consecutivos excessivos");
        }
    }
    c.finish()
}

pub fn notification(rec: &Map<String, Value>) -> Validation {
    let mut c = Checker::new(rec);
    if let Some(title) = c.required("title", "Título é obrigatório") {
        c.length("title", title, 3, 200, "Título");
        if has_consecutive_spaces(title, 2) {
            c.fail("title", "Título não pode conter espaços consecutivos");
        }
    }
    if let Some(when) = c.required("when", "Data é obrigatória") {
        if let Some(d) = c.date("when", when, "Data") {
            if d.year() < 1900 {
                c.fail("when", "Data não pode ser anterior a 1900");
            }
        }
    }
    if let Some(description) = c.optional("description") {
        c.length("description", description, 3, 500, "Descrição");
    }
    c.finish()
}

fn user_identity(c: &mut Checker<'_>) {
    if let Some(name) = c.required("name", "Nome é obrigatório") {
        c.length("name", name, 3, 100, "Nome");
        if !letters_and_spaces(name) {
            c.fail("name", "Nome deve conter apenas letras e espaços");
        } else if has_consecutive_spaces(name, 2) {
            c.fail("name", "Nome não pode conter espaços consecutivos");
        }
    }
    if let Some(email) = c.required("email", "Email é obrigatório") {
        if !is_valid_email(email) {
            c.fail("email", "Email deve ter um formato válido");
        }
    }
}

/// Edit of an existing user. Stored passwords predate the password policy,
/// so only their presence is checked.
pub fn user_profile(rec: &Map<String, Value>) -> Validation {
    let mut c = Checker::new(rec);
    user_identity(&mut c);
    if rec.get("password").and_then(Value::as_str).map_or(true, str::is_empty) {
        c.fail("password", "Senha é obrigatória");
    }
    c.finish()
}

pub fn register(rec: &Map<String, Value>) -> Validation {
    let mut c = Checker::new(rec);
    user_identity(&mut c);

    // Passwords are not trimmed.
    let password = rec.get("password").and_then(Value::as_str).unwrap_or("");
    if password.is_empty() {
        c.fail("password", "Senha é obrigatória");
    } else {
        let n = password.chars().count();
        let problem = if n < 8 {
            Some("Senha deve ter pelo menos 8 caracteres")
        } else if n > 100 {
            Some("Senha deve ter no máximo 100 caracteres")
        } else if password.chars().any(char::is_whitespace) {
            Some("Senha não pode conter espaços em branco")
        } else if !password.chars().any(|ch| ch.is_ascii_lowercase()) {
            Some("Senha deve conter pelo menos uma letra minúscula")
        } else if !password.chars().any(|ch| ch.is_ascii_uppercase()) {
            Some("Senha deve conter pelo menos uma letra maiúscula")
        } else if !password.chars().any(|ch| ch.is_ascii_digit()) {
            Some("Senha deve conter pelo menos um número")
        } else if !password.chars().any(|ch| "@$!%*?&".contains(ch)) {
            Some("Senha deve conter pelo menos um caractere especial (@$!%*?&)")
        } else {
            None
        };
        if let Some(message) = problem {
            c.fail("password", message);
        }
    }
    if let Some(confirm) = rec.get("confirmPassword") {
        if confirm.as_str() != Some(password) {
            c.fail("confirmPassword", "As senhas devem ser iguais");
        }
    }
    c.finish()
}
