use crate::utils::{apply_derives, ensure_required_fields};
use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Item, ItemStruct, Result, Token, Type, parse::Parse, parse::ParseStream, parse_macro_input};

/// #[aggregate] 宏实现
/// - 若缺失则追加字段 `id: IdType` 与 `events: PendingEvents<EventType>`（后者 `#[serde(skip)]`），并置于字段最前
/// - 合并/规范 derive：Debug、Clone、Serialize、Deserialize
/// - 自动实现 `::nexus_domain::entity::Entity`
/// - 参数：`#[aggregate(id = IdType, event = EventType)]`，两者均必填
///
/// `Aggregate` 本身仍需手写（`TYPE`、`Primitives`、`pending`、`to_primitives`）。
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = parse_macro_input!(attr as AggregateAttrConfig);
    let input = parse_macro_input!(item as Item);

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(other.span(), "#[aggregate] only on struct")
                .to_compile_error()
                .into();
        }
    };

    let (Some(id_type), Some(event_type)) = (cfg.id_ty, cfg.event_ty) else {
        return syn::Error::new(
            st.ident.span(),
            "#[aggregate] requires both 'id = IdType' and 'event = EventType'",
        )
        .to_compile_error()
        .into();
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(st.span(), "only supports named-field struct")
                .to_compile_error()
                .into();
        }
    };

    ensure_required_fields(
        fields_named,
        vec![
            syn::parse_quote! { id: #id_type },
            syn::parse_quote! {
                #[serde(skip)]
                events: ::nexus_domain::aggregate::PendingEvents<#event_type>
            },
        ],
        /*reposition_existing*/ true,
    );

    let required: Vec<syn::Path> = vec![
        syn::parse_quote!(Debug),
        syn::parse_quote!(Clone),
        syn::parse_quote!(serde::Serialize),
        syn::parse_quote!(serde::Deserialize),
    ];
    apply_derives(&mut st.attrs, required);

    let out_struct = ItemStruct { ..st };

    let ident = &out_struct.ident;
    let generics = out_struct.generics.clone();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        #out_struct

        impl #impl_generics ::nexus_domain::entity::Entity for #ident #ty_generics #where_clause {
            type Id = #id_type;

            fn id(&self) -> &Self::Id { &self.id }
        }
    };

    TokenStream::from(expanded)
}

// -------- parsing --------

struct AggregateAttrConfig {
    id_ty: Option<Type>,
    event_ty: Option<Type>,
}

impl Parse for AggregateAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self {
            id_ty: None,
            event_ty: None,
        };

        let pairs: Punctuated<syn::MetaNameValue, Token![,]> =
            Punctuated::<syn::MetaNameValue, Token![,]>::parse_terminated(input)?;

        for pair in pairs {
            let Some(key) = pair.path.get_ident().map(|i| i.to_string()) else {
                return Err(syn::Error::new(pair.path.span(), "invalid attribute key"));
            };
            match key.as_str() {
                "id" => set_once(&mut cfg.id_ty, parse_type(&pair.value)?, &pair, "id")?,
                "event" => {
                    set_once(&mut cfg.event_ty, parse_type(&pair.value)?, &pair, "event")?
                }
                _ => {
                    return Err(syn::Error::new(
                        pair.path.span(),
                        "unknown key in attribute; expected 'id' | 'event'",
                    ));
                }
            }
        }

        Ok(cfg)
    }
}

fn parse_type(expr: &syn::Expr) -> Result<Type> {
    syn::parse2(expr.to_token_stream())
}

fn set_once<T>(slot: &mut Option<T>, value: T, pair: &syn::MetaNameValue, key: &str) -> Result<()> {
    if slot.is_some() {
        return Err(syn::Error::new(
            pair.path.span(),
            format!("duplicate key '{key}' in attribute"),
        ));
    }
    *slot = Some(value);
    Ok(())
}
