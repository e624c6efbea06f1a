use crate::utils::{apply_derives, ensure_required_fields, screaming_snake};
use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[domain_event] 宏实现
/// - 支持具名字段变体 `Variant { .. }` 与单元变体 `Variant`（单元变体会被改写为具名字段变体）
/// - 确保每个变体具备字段：`id: String`, `aggregate_id: IdType`, `occurred_at: OccurredAt`
/// - 生成 `DomainEvent` 与 `AggregateEvent` 实现
/// - 为每个变体生成 `EventKind` 常量（如 `Created` → `CREATED`）以及 `KINDS`
/// - 参数：`#[domain_event(aggregate = IdType)]`（必填）
/// - 变体可覆写事件类别：`#[event(kind = "...")]`，默认 `"Enum.Variant"`
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as EventAttrConfig);
    let mut input = parse_macro_input!(item as Item);

    let enum_item = match &mut input {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on enum types",
            )
            .to_compile_error()
            .into();
        }
    };

    let Some(aggregate_ty) = cfg.aggregate_ty else {
        return syn::Error::new(
            enum_item.ident.span(),
            "#[domain_event] requires 'aggregate = IdType'",
        )
        .to_compile_error()
        .into();
    };

    if enum_item.variants.is_empty() {
        return syn::Error::new(
            enum_item.ident.span(),
            "#[domain_event] requires at least one variant",
        )
        .to_compile_error()
        .into();
    }

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(PartialEq),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut enum_item.attrs, required);

    let enum_name = enum_item.ident.to_string();
    let mut kinds: Vec<(syn::Ident, syn::Ident, syn::LitStr)> = Vec::new();

    for v in &mut enum_item.variants {
        if matches!(v.fields, syn::Fields::Unit) {
            v.fields = syn::Fields::Named(syn::parse_quote!({}));
        }

        let fields_named = match &mut v.fields {
            syn::Fields::Named(fields_named) => fields_named,
            _ => {
                return syn::Error::new(
                    v.span(),
                    "#[domain_event] supports only named-field or unit variants, e.g., Variant { x: T }",
                )
                .to_compile_error()
                .into();
            }
        };

        ensure_required_fields(
            fields_named,
            vec![
                syn::parse_quote! { id: String },
                syn::parse_quote! { aggregate_id: #aggregate_ty },
                syn::parse_quote! { occurred_at: ::nexus_domain::domain_event::OccurredAt },
            ],
            /*reposition_existing*/ false,
        );

        let mut retained_attrs = Vec::new();
        let mut kind_lit: Option<syn::LitStr> = None;
        for attr in v.attrs.iter() {
            if attr.path().is_ident("event") {
                match parse_variant_kind(attr) {
                    Ok(lit) => {
                        if kind_lit.is_some() {
                            return syn::Error::new(
                                attr.span(),
                                "duplicate 'kind' specified for this variant",
                            )
                            .to_compile_error()
                            .into();
                        }
                        kind_lit = Some(lit);
                    }
                    Err(err) => return err.to_compile_error().into(),
                }
            } else {
                retained_attrs.push(attr.clone());
            }
        }
        v.attrs = retained_attrs;

        let kind_lit = kind_lit.unwrap_or_else(|| {
            syn::LitStr::new(&format!("{}.{}", enum_name, v.ident), v.ident.span())
        });
        let const_ident = format_ident!("{}", screaming_snake(&v.ident.to_string()));
        kinds.push((v.ident.clone(), const_ident, kind_lit));
    }

    let enum_ident = &enum_item.ident;
    let variants: Vec<&syn::Ident> = kinds.iter().map(|(v, _, _)| v).collect();
    let const_idents: Vec<&syn::Ident> = kinds.iter().map(|(_, c, _)| c).collect();
    let kind_lits: Vec<&syn::LitStr> = kinds.iter().map(|(_, _, l)| l).collect();

    let out = quote! {
        #enum_item

        impl #enum_ident {
            #( pub const #const_idents: ::nexus_domain::domain_event::EventKind =
                ::nexus_domain::domain_event::EventKind::new(#kind_lits); )*

            /// 该事件枚举涵盖的全部事件类别
            pub const KINDS: &'static [::nexus_domain::domain_event::EventKind] =
                &[ #( Self::#const_idents ),* ];
        }

        impl ::nexus_domain::domain_event::DomainEvent for #enum_ident {
            fn event_id(&self) -> &str {
                match self { #( Self::#variants { id, .. } => id.as_str(), )* }
            }

            fn kind(&self) -> ::nexus_domain::domain_event::EventKind {
                match self { #( Self::#variants { .. } => Self::#const_idents, )* }
            }

            fn aggregate_key(&self) -> ::nexus_domain::value_object::AggregateKey {
                ::nexus_domain::value_object::AggregateKey::of(
                    <Self as ::nexus_domain::domain_event::AggregateEvent>::aggregate_id(self),
                )
            }

            fn occurred_at(&self) -> ::nexus_domain::domain_event::OccurredAt {
                match self { #( Self::#variants { occurred_at, .. } => *occurred_at, )* }
            }
        }

        impl ::nexus_domain::domain_event::AggregateEvent for #enum_ident {
            type Id = #aggregate_ty;

            fn aggregate_id(&self) -> &Self::Id {
                match self { #( Self::#variants { aggregate_id, .. } => aggregate_id, )* }
            }
        }
    };

    TokenStream::from(out)
}

// -------- parsing --------

fn parse_variant_kind(attr: &syn::Attribute) -> Result<syn::LitStr> {
    let pair: syn::MetaNameValue = attr.parse_args()?;
    if !pair.path.is_ident("kind") {
        return Err(syn::Error::new(
            pair.path.span(),
            "unknown key; expected #[event(kind = \"...\")]",
        ));
    }
    match pair.value {
        syn::Expr::Lit(syn::ExprLit {
            lit: syn::Lit::Str(lit),
            ..
        }) => Ok(lit),
        other => Err(syn::Error::new(
            other.span(),
            "expected string literal for 'kind'",
        )),
    }
}

// 枚举级配置：所属聚合的标识类型
struct EventAttrConfig {
    aggregate_ty: Option<Type>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut aggregate_ty: Option<Type> = None;

        let pairs: Punctuated<syn::MetaNameValue, Token![,]> =
            Punctuated::<syn::MetaNameValue, Token![,]>::parse_terminated(input)?;

        for pair in pairs {
            if !pair.path.is_ident("aggregate") {
                return Err(syn::Error::new(
                    pair.path.span(),
                    "unknown key; expected 'aggregate'",
                ));
            }
            if aggregate_ty.is_some() {
                return Err(syn::Error::new(
                    pair.path.span(),
                    "duplicate key 'aggregate' in attribute",
                ));
            }
            aggregate_ty = Some(syn::parse2(pair.value.to_token_stream())?);
        }

        Ok(Self { aggregate_ty })
    }
}
